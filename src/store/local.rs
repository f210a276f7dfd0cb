//! Directory-backed stores.
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/
//!   blobs/<uuid>/<file name>   one directory per upload
//!   records.json               every record, as a key → JSON string map
//! ```
//!
//! Both writers go through a temp file and a rename, so a crash never leaves a
//! half-written blob or a truncated record map behind.

use super::{matches_pattern, BlobStore, KvEntry, RecordStore, UploadedBlob};
use crate::error::StoreError;
use crate::record::DocumentFile;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

const BLOB_DIR: &str = "blobs";
const RECORDS_FILE: &str = "records.json";

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write `bytes` next to `path`, then move it into place.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err(parent))?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, bytes).await.map_err(io_err(path))?;
    tokio::fs::rename(&tmp_path, path).await.map_err(io_err(path))?;
    Ok(())
}

// ── Blobs ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a store-relative path, refusing anything that escapes the root.
    fn resolve(&self, relative: &str) -> Result<PathBuf, StoreError> {
        let rel = Path::new(relative);
        let clean = !relative.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !clean {
            return Err(StoreError::InvalidPath(relative.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

/// Last path component of an upload name; never empty.
fn safe_file_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    match base {
        "" | "." | ".." => "upload.bin".to_string(),
        other => other.to_string(),
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, file: &DocumentFile) -> Result<UploadedBlob, StoreError> {
        let relative = format!("{BLOB_DIR}/{}/{}", Uuid::new_v4(), safe_file_name(&file.name));
        let target = self.resolve(&relative)?;
        write_atomic(&target, &file.bytes).await?;
        debug!("Stored blob {} ({} bytes)", relative, file.len());
        Ok(UploadedBlob {
            path: relative,
            size: file.len(),
        })
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let target = self.resolve(path)?;
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(path.to_string()))
            }
            Err(source) => Err(StoreError::Io {
                path: target,
                source,
            }),
        }
    }
}

// ── Records ──────────────────────────────────────────────────────────────

/// Record store persisted as a single JSON object.
///
/// Every operation reloads the file, so several processes pointed at the same
/// directory see each other's completed writes. Writes inside one process are
/// serialised by the mutex.
#[derive(Debug)]
pub struct LocalRecordStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl LocalRecordStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            path: root.as_ref().join(RECORDS_FILE),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_slice(&raw)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", self.path.display())))
    }
}

#[async_trait]
impl RecordStore for LocalRecordStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(key.to_string(), value.to_string());
        let bytes = serde_json::to_vec_pretty(&entries)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        write_atomic(&self.path, &bytes).await
    }

    async fn list(&self, pattern: &str, with_values: bool) -> Result<Vec<KvEntry>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self
            .load()
            .await?
            .into_iter()
            .filter(|(k, _)| matches_pattern(pattern, k))
            .map(|(key, value)| KvEntry {
                key,
                value: with_values.then_some(value),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blob_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        let uploaded = store
            .upload(&DocumentFile::png("cv.png", b"\x89PNG".to_vec()))
            .await
            .unwrap();
        assert!(uploaded.path.starts_with("blobs/"));
        assert!(dir.path().join(&uploaded.path).exists());
        assert_eq!(store.read(&uploaded.path).await.unwrap(), b"\x89PNG");
    }

    #[tokio::test]
    async fn blob_name_cannot_escape_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        let uploaded = store
            .upload(&DocumentFile::pdf("../../etc/passwd", b"%PDF".to_vec()))
            .await
            .unwrap();
        assert!(uploaded.path.ends_with("/passwd"));
        assert!(uploaded.path.starts_with("blobs/"));

        assert!(matches!(
            store.read("../outside").await,
            Err(StoreError::InvalidPath(_))
        ));
        assert!(matches!(
            store.read("/etc/passwd").await,
            Err(StoreError::InvalidPath(_))
        ));
        assert!(matches!(
            store.read("blobs/none/x.png").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn safe_names() {
        assert_eq!(safe_file_name("cv.pdf"), "cv.pdf");
        assert_eq!(safe_file_name("a/b\\c.pdf"), "c.pdf");
        assert_eq!(safe_file_name(".."), "upload.bin");
        assert_eq!(safe_file_name("dir/"), "upload.bin");
    }

    #[tokio::test]
    async fn records_survive_a_new_handle() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = LocalRecordStore::new(dir.path());
            store.set("resume:1", "{\"id\":\"1\"}").await.unwrap();
            store.set("resume:2", "{\"id\":\"2\"}").await.unwrap();
            store.set("resume:1", "{\"id\":\"1b\"}").await.unwrap();
        }
        let store = LocalRecordStore::new(dir.path());
        assert_eq!(
            store.get("resume:1").await.unwrap().as_deref(),
            Some("{\"id\":\"1b\"}")
        );
        let listed = store.list("resume:*", false).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn missing_file_is_an_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalRecordStore::new(dir.path().join("fresh"));
        assert_eq!(store.get("resume:x").await.unwrap(), None);
        assert!(store.list("*", true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(RECORDS_FILE), b"not json").unwrap();
        let store = LocalRecordStore::new(dir.path());
        assert!(matches!(
            store.get("resume:x").await,
            Err(StoreError::Corrupt(_))
        ));
    }
}
