use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Invalid JSON in {key}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, CloudError>;

impl From<CloudError> for ng_link_core::Error {
    fn from(err: CloudError) -> Self {
        match err {
            CloudError::Io(io_err) => ng_link_core::Error::Io(io_err),
            CloudError::Json { source, .. } => ng_link_core::Error::Json(source),
            other => ng_link_core::Error::Storage(other.to_string()),
        }
    }
}

/// Why a descriptor upload failed
///
/// Uploads are optional, so callers usually log these and carry on.
#[derive(Error, Debug)]
pub enum UploadError {
    /// No usable credentials or region could be resolved
    #[error("credentials error: {0}")]
    Credentials(String),

    /// Credentials were accepted but the bucket refused the write
    #[error("permission denied for s3://{bucket}/{key}: {message}")]
    Permission {
        bucket: String,
        key: String,
        message: String,
    },

    /// The bucket does not exist or is not reachable under that name
    #[error("bucket or key not found: s3://{bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// The request did not complete
    #[error("network error: {0}")]
    Network(String),

    /// The local file could not be read
    #[error("cannot read {}: {source}", .path.display())]
    LocalFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Anything else the store reported
    #[error("upload failed: {0}")]
    Other(String),
}

impl UploadError {
    /// Classify a store error for an upload to `bucket`/`key`
    pub fn from_store(err: object_store::Error, bucket: &str, key: &str) -> Self {
        match err {
            object_store::Error::NotFound { .. } => UploadError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
            object_store::Error::PermissionDenied { source, .. } => UploadError::Permission {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: source.to_string(),
            },
            object_store::Error::Unauthenticated { source, .. } => {
                UploadError::Credentials(source.to_string())
            }
            object_store::Error::UnknownConfigurationKey { key, .. } => {
                UploadError::Credentials(format!("unknown configuration key {}", key))
            }
            object_store::Error::Generic { source, .. } => {
                UploadError::Network(source.to_string())
            }
            other => UploadError::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_and_json_keep_their_core_class() {
        let io = CloudError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let core: ng_link_core::Error = io.into();
        assert!(matches!(core, ng_link_core::Error::Io(_)));
        assert_eq!(core.to_string(), "gone");

        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let json = CloudError::Json {
            key: "exa/SPIM.zarr/.zattrs".to_string(),
            source,
        };
        assert_eq!(json.to_string(), "Invalid JSON in exa/SPIM.zarr/.zattrs");
        let core: ng_link_core::Error = json.into();
        assert!(matches!(core, ng_link_core::Error::Json(_)));
    }

    #[test]
    fn test_runtime_becomes_storage() {
        let core: ng_link_core::Error = CloudError::Runtime("no reactor".to_string()).into();
        assert!(matches!(core, ng_link_core::Error::Storage(ref m) if m.contains("no reactor")));
    }
}
