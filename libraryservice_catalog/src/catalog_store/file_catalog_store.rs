use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::catalog_store::{Bucket, CatalogStore, CatalogStoreError};

/// Keeps each bucket as `<bucket>.json` inside one directory
pub struct FileCatalogStore {
    directory: PathBuf,
}

impl FileCatalogStore {
    /// Opens the store, creating the directory when missing
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self, CatalogStoreError> {
        let directory = directory.into();
        fs::create_dir_all(&directory)
            .map_err(|err| CatalogStoreError::IoFailure(directory.clone(), err))?;
        tracing::info!("Catalog data directory: {}", directory.display());
        Ok(Self { directory })
    }

    fn bucket_path(&self, bucket: Bucket) -> PathBuf {
        self.directory.join(format!("{}.json", bucket.key()))
    }
}

impl CatalogStore for FileCatalogStore {
    fn get(&self, bucket: Bucket) -> Option<String> {
        let path = self.bucket_path(bucket);
        match fs::read_to_string(&path) {
            Ok(blob) => Some(blob),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => {
                tracing::warn!("Failed to read {}: {}", path.display(), err);
                None
            }
        }
    }

    fn set(&self, bucket: Bucket, blob: String) -> Result<(), CatalogStoreError> {
        let path = self.bucket_path(bucket);
        fs::write(&path, blob).map_err(|err| CatalogStoreError::IoFailure(path, err))
    }
}
