//! In-process stores. Nothing survives the process.

use super::{matches_pattern, BlobStore, KvEntry, RecordStore, UploadedBlob};
use crate::error::StoreError;
use crate::record::DocumentFile;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, file: &DocumentFile) -> Result<UploadedBlob, StoreError> {
        let path = format!("blobs/{}/{}", Uuid::new_v4(), file.name);
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        blobs.insert(path.clone(), file.bytes.clone());
        Ok(UploadedBlob {
            path,
            size: file.len(),
        })
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        blobs
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }
}

#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn list(&self, pattern: &str, with_values: bool) -> Result<Vec<KvEntry>, StoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(entries
            .iter()
            .filter(|(k, _)| matches_pattern(pattern, k))
            .map(|(k, v)| KvEntry {
                key: k.clone(),
                value: with_values.then(|| v.clone()),
            })
            .collect())
    }
}
