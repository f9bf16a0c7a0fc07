use std::fmt;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use file_catalog_store::FileCatalogStore;
pub use in_memory_catalog_store::InMemoryCatalogStore;

mod file_catalog_store;
mod in_memory_catalog_store;

/// Named persisted collection
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Bucket {
    Members,
    Books,
    Transactions,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Members, Bucket::Books, Bucket::Transactions];

    pub fn key(&self) -> &'static str {
        match self {
            Bucket::Members => "members",
            Bucket::Books => "books",
            Bucket::Transactions => "transactions",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogStoreError {
    #[error("Failed to serialize records: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Failed to access {0}: {1}")]
    IoFailure(PathBuf, #[source] std::io::Error),
}

/// Opaque blob store keyed by bucket. Every write replaces the whole bucket.
pub trait CatalogStore: Send + Sync {
    /// Returns the blob saved under the bucket, None if nothing was saved yet
    fn get(&self, bucket: Bucket) -> Option<String>;
    /// Overwrites the bucket with the given blob
    fn set(&self, bucket: Bucket, blob: String) -> Result<(), CatalogStoreError>;
}

/// Loads a bucket as records. Absent or malformed blobs load as an empty collection.
pub fn load_records<T: DeserializeOwned>(store: &dyn CatalogStore, bucket: Bucket) -> Vec<T> {
    let Some(blob) = store.get(bucket) else {
        return vec![];
    };

    match serde_json::from_str(&blob) {
        Ok(records) => records,
        Err(err) => {
            tracing::warn!("Bucket {} is malformed, starting with empty collection: {}", bucket, err);
            vec![]
        }
    }
}

pub fn save_records<T: Serialize>(
    store: &dyn CatalogStore,
    bucket: Bucket,
    records: &[T],
) -> Result<(), CatalogStoreError> {
    let blob = serde_json::to_string(records)?;
    store.set(bucket, blob)
}
