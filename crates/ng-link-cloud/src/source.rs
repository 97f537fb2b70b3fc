//! Dataset metadata read straight from the bucket

use crate::{CloudError, CloudStore};
use ng_link_core::source::MetadataSource;
use object_store::path::Path as ObjectPath;
use serde_json::Value;
use tracing::trace;

/// [`MetadataSource`] over a [`CloudStore`]
#[derive(Debug, Clone)]
pub struct ObjectStoreSource {
    store: CloudStore,
}

impl ObjectStoreSource {
    /// Read metadata through `store`
    pub fn new(store: CloudStore) -> Self {
        Self { store }
    }

    fn read_json_inner(&self, key: &str) -> crate::Result<Option<Value>> {
        let path = ObjectPath::from(key);
        trace!("GET s3://{}/{}", self.store.bucket(), path);

        let bytes = self.store.block_on(async {
            match self.store.store().get(&path).await {
                Ok(result) => result.bytes().await.map(Some),
                Err(object_store::Error::NotFound { .. }) => Ok(None),
                Err(e) => Err(e),
            }
        })?;

        match bytes {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|source| CloudError::Json {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    fn list_zarr_folders_inner(&self, prefix: &str) -> crate::Result<Vec<String>> {
        let prefix = prefix.trim_matches('/');
        let prefix_path = (!prefix.is_empty()).then(|| ObjectPath::from(prefix));
        trace!("LIST s3://{}/{}/", self.store.bucket(), prefix);

        let listing = self.store.block_on(async {
            self.store
                .store()
                .list_with_delimiter(prefix_path.as_ref())
                .await
        })?;

        let mut folders: Vec<String> = listing
            .common_prefixes
            .iter()
            .filter_map(|p| p.filename())
            .filter(|name| name.ends_with(".zarr"))
            .map(str::to_string)
            .collect();
        folders.sort();
        Ok(folders)
    }
}

impl MetadataSource for ObjectStoreSource {
    fn read_json(&self, key: &str) -> ng_link_core::Result<Option<Value>> {
        Ok(self.read_json_inner(key)?)
    }

    fn list_zarr_folders(&self, prefix: &str) -> ng_link_core::Result<Vec<String>> {
        Ok(self.list_zarr_folders_inner(prefix)?)
    }
}
