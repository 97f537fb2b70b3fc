//! Error types for ng-link-core

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Core error types for the ng-link library
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Descriptor or metadata document is not valid JSON
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Object-storage URI does not use the `s3://` scheme
    #[error("Invalid S3 path format: {0}")]
    InvalidUri(String),

    /// Configuration-related error
    #[error("Configuration error: {0}")]
    Config(String),

    /// OME-Zarr metadata is missing or malformed
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// The link generator failed to build a viewer state
    #[error("Link generation failed: {0}")]
    Generator(String),

    /// The link generator returned but no descriptor appeared in time
    #[error("Descriptor {} was not produced within {:?}", .path.display(), .waited)]
    DescriptorMissing { path: PathBuf, waited: Duration },

    /// A metadata source could not reach its backing store
    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, Error>;
