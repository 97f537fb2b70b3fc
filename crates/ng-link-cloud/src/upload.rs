//! Descriptor upload

use crate::error::UploadError;
use crate::store::{CloudStore, S3Options};
use object_store::path::Path as ObjectPath;
use object_store::PutPayload;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Uploads local files into one bucket
#[derive(Debug, Clone)]
pub struct Uploader {
    store: CloudStore,
}

impl Uploader {
    /// Uploader for `bucket` using the ambient S3 credential chain
    pub fn s3(bucket: &str, options: &S3Options) -> Result<Self, UploadError> {
        let store = CloudStore::s3(bucket, options)
            .map_err(|e| UploadError::Credentials(e.to_string()))?;
        Ok(Self { store })
    }

    /// Uploader over an existing store
    pub fn new(store: CloudStore) -> Self {
        Self { store }
    }

    /// Bucket files are uploaded to
    pub fn bucket(&self) -> &str {
        self.store.bucket()
    }

    /// Upload `local_path` to `key`, returning the number of bytes written
    pub fn upload_file(&self, local_path: &Path, key: &str) -> Result<u64, UploadError> {
        let data = fs::read(local_path).map_err(|source| UploadError::LocalFile {
            path: local_path.to_path_buf(),
            source,
        })?;
        let len = data.len() as u64;
        let location = ObjectPath::from(key);

        debug!("Uploading {} bytes to s3://{}/{}", len, self.bucket(), location);
        self.store
            .block_on(self.store.store().put(&location, PutPayload::from(data)))
            .map_err(|e| UploadError::from_store(e, self.bucket(), key))?;

        info!(
            "File {} uploaded to {}/{}",
            local_path.display(),
            self.bucket(),
            key
        );
        Ok(len)
    }
}

/// Upload a file to `s3://bucket/key` in one call
pub fn upload_to_s3(
    local_path: &Path,
    bucket: &str,
    key: &str,
    options: &S3Options,
) -> Result<u64, UploadError> {
    Uploader::s3(bucket, options)?.upload_file(local_path, key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;
    use object_store::ObjectStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_upload_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("process_output.json");
        fs::write(&file, br#"{"layers": []}"#).unwrap();

        let memory = Arc::new(InMemory::new());
        let store = CloudStore::from_store(memory.clone(), "up").unwrap();
        let uploader = Uploader::new(store.clone());

        let written = uploader.upload_file(&file, "a/b/process_output.json").unwrap();
        assert_eq!(written, 14);

        let stored = store
            .block_on(async {
                memory
                    .get(&ObjectPath::from("a/b/process_output.json"))
                    .await
                    .unwrap()
                    .bytes()
                    .await
            })
            .unwrap();
        assert_eq!(&stored[..], br#"{"layers": []}"#);
    }

    #[test]
    fn test_upload_missing_local_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = CloudStore::from_store(Arc::new(InMemory::new()), "up").unwrap();
        let err = Uploader::new(store)
            .upload_file(&temp_dir.path().join("nope.json"), "k.json")
            .unwrap_err();
        assert!(matches!(err, UploadError::LocalFile { .. }));
    }

    #[test]
    fn test_store_errors_are_classified() {
        let not_found = object_store::Error::NotFound {
            path: "k".to_string(),
            source: "missing".into(),
        };
        assert!(matches!(
            UploadError::from_store(not_found, "b", "k"),
            UploadError::NotFound { .. }
        ));

        let denied = object_store::Error::PermissionDenied {
            path: "k".to_string(),
            source: "403 Forbidden".into(),
        };
        assert!(matches!(
            UploadError::from_store(denied, "b", "k"),
            UploadError::Permission { .. }
        ));

        let network = object_store::Error::Generic {
            store: "S3",
            source: "connection reset".into(),
        };
        assert!(matches!(
            UploadError::from_store(network, "b", "k"),
            UploadError::Network(_)
        ));
    }
}
