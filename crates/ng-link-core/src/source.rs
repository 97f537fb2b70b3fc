//! Where link generators read dataset metadata from
//!
//! Keys are object keys inside the dataset's bucket (no scheme, no bucket,
//! no leading slash). The object-storage implementation lives in
//! `ng-link-cloud`; `LocalMetadataSource` serves a mirrored bucket from disk.

use crate::Result;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::trace;

/// Read access to the metadata documents of a bucket
pub trait MetadataSource: Send + Sync {
    /// Read and parse the JSON document at `key`, `Ok(None)` if it does not exist
    fn read_json(&self, key: &str) -> Result<Option<Value>>;

    /// Names of the `*.zarr` folders directly below `prefix`, sorted
    fn list_zarr_folders(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Metadata source backed by a local directory laid out like the bucket
#[derive(Debug, Clone)]
pub struct LocalMetadataSource {
    root: PathBuf,
}

impl LocalMetadataSource {
    /// Serve keys relative to `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl MetadataSource for LocalMetadataSource {
    fn read_json(&self, key: &str) -> Result<Option<Value>> {
        let path = self.root.join(key.trim_start_matches('/'));
        trace!("Reading metadata from {:?}", path);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list_zarr_folders(&self, prefix: &str) -> Result<Vec<String>> {
        let dir = self.root.join(prefix.trim_matches('/'));
        let mut folders = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".zarr") {
                folders.push(name);
            }
        }
        folders.sort();
        Ok(folders)
    }
}
