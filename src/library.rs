//! Reading records back for display.
//!
//! The pipeline only writes. These helpers serve the result view (one record
//! by id), the dashboard (every record), and the review page (a record with
//! its stored document and preview image).

use crate::error::StoreError;
use crate::record::{IngestionRecord, RecordId, RECORD_PATTERN};
use crate::store::{BlobStore, RecordStore};
use tracing::{debug, warn};

/// One record by id. `Ok(None)` when no record has that id.
pub async fn load_record(
    records: &dyn RecordStore,
    id: &RecordId,
) -> Result<Option<IngestionRecord>, StoreError> {
    let key = id.key();
    let Some(raw) = records.get(&key).await? else {
        debug!("No record at {}", key);
        return Ok(None);
    };
    IngestionRecord::from_json(&raw)
        .map(Some)
        .map_err(|e| StoreError::Corrupt(format!("{key}: {e}")))
}

/// Every record, sorted by id. Undecodable entries are skipped with a warning.
pub async fn list_records(records: &dyn RecordStore) -> Result<Vec<IngestionRecord>, StoreError> {
    let entries = records.list(RECORD_PATTERN, true).await?;
    let mut out: Vec<IngestionRecord> = entries
        .into_iter()
        .filter_map(|entry| {
            let raw = entry.value?;
            match IngestionRecord::from_json(&raw) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping unreadable record {}: {}", entry.key, e);
                    None
                }
            }
        })
        .collect();
    out.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(out)
}

/// A record together with the files it points at.
#[derive(Debug, Clone)]
pub struct ReviewBundle {
    pub record: IngestionRecord,
    /// Original PDF bytes.
    pub document: Vec<u8>,
    /// Rendered page 1 (PNG).
    pub image: Vec<u8>,
}

impl ReviewBundle {
    /// True once a review has been stored.
    pub fn has_evaluation(&self) -> bool {
        self.record.evaluation.is_some()
    }
}

/// Load a record and both of its blobs.
pub async fn load_review(
    blobs: &dyn BlobStore,
    records: &dyn RecordStore,
    id: &RecordId,
) -> Result<ReviewBundle, StoreError> {
    let record = load_record(records, id)
        .await?
        .ok_or_else(|| StoreError::NotFound(id.key()))?;
    let document = blobs.read(&record.document_path).await?;
    let image = blobs.read(&record.image_path).await?;
    Ok(ReviewBundle {
        record,
        document,
        image,
    })
}
