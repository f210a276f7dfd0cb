//! Storage collaborators: a blob store for files and a key-value record store.
//!
//! The pipeline only sees the two traits. [`memory`] backs tests and
//! throwaway runs; [`local`] persists to a directory so the CLI can list and
//! export earlier runs.

pub mod local;
pub mod memory;

use crate::error::StoreError;
use crate::record::DocumentFile;
use async_trait::async_trait;

pub use local::{LocalBlobStore, LocalRecordStore};
pub use memory::{MemoryBlobStore, MemoryRecordStore};

/// Where an uploaded file ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedBlob {
    /// Store-relative path, later handed back to [`BlobStore::read`].
    pub path: String,
    pub size: usize,
}

/// File storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, file: &DocumentFile) -> Result<UploadedBlob, StoreError>;
    async fn read(&self, path: &str) -> Result<Vec<u8>, StoreError>;
}

/// One entry returned by [`RecordStore::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvEntry {
    pub key: String,
    /// Present only when the listing asked for values.
    pub value: Option<String>,
}

/// String key-value storage for ingestion records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    /// Insert or overwrite.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Keys matching `pattern`, sorted. See [`matches_pattern`].
    async fn list(&self, pattern: &str, with_values: bool) -> Result<Vec<KvEntry>, StoreError>;
}

/// Key patterns are either an exact key or a prefix followed by a single
/// trailing `*`.
pub fn matches_pattern(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key == pattern,
    }
}
