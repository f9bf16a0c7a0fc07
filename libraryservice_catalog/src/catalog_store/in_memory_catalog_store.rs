use std::collections::HashMap;

use crate::catalog_store::{Bucket, CatalogStore, CatalogStoreError};

#[derive(Default)]
pub struct InMemoryCatalogStore {
    blobs: parking_lot::RwLock<HashMap<Bucket, String>>,
}

impl CatalogStore for InMemoryCatalogStore {
    fn get(&self, bucket: Bucket) -> Option<String> {
        self.blobs.read().get(&bucket).cloned()
    }

    fn set(&self, bucket: Bucket, blob: String) -> Result<(), CatalogStoreError> {
        self.blobs.write().insert(bucket, blob);
        Ok(())
    }
}
