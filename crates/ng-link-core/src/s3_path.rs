//! Object-storage URI handling
//!
//! Dataset locations are given as `s3://bucket/path/to/dataset.zarr`. The
//! bucket and the directory that holds the dataset are derived here once and
//! then used to label output and to pick an upload destination.

use crate::descriptor::DESCRIPTOR_FILE_NAME;
use crate::{Error, Result};
use std::fmt;

/// URI scheme prefix accepted for dataset locations
pub const S3_SCHEME: &str = "s3://";

/// A parsed `s3://` location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    bucket: String,
    key: String,
    parent_directory: String,
}

impl S3Location {
    /// Bucket name (first path segment)
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Everything after the bucket, unmodified
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Segments between the bucket and the last segment, joined with `/`
    ///
    /// Empty when the dataset sits directly at the bucket root.
    pub fn parent_directory(&self) -> &str {
        &self.parent_directory
    }

    /// Last path segment, normally the dataset's own name
    pub fn dataset_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or_default()
    }
}

impl fmt::Display for S3Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.key.is_empty() {
            write!(f, "{}{}", S3_SCHEME, self.bucket)
        } else {
            write!(f, "{}{}/{}", S3_SCHEME, self.bucket, self.key)
        }
    }
}

/// Parse an `s3://bucket/path/to/dataset` URI into bucket and parent directory
///
/// The last segment is treated as the dataset itself and dropped from the
/// parent directory. Segment count is not validated.
pub fn parse_s3_path(uri: &str) -> Result<S3Location> {
    let rest = uri
        .strip_prefix(S3_SCHEME)
        .ok_or_else(|| Error::InvalidUri(uri.to_string()))?;

    let parts: Vec<&str> = rest.split('/').collect();
    let bucket = parts[0].to_string();
    let parent_directory = if parts.len() > 2 {
        parts[1..parts.len() - 1].join("/")
    } else {
        String::new()
    };
    let key = rest.splitn(2, '/').nth(1).unwrap_or_default().to_string();

    Ok(S3Location {
        bucket,
        key,
        parent_directory,
    })
}

/// Trim a path to its `.zarr` root, dropping e.g. a trailing resolution index
///
/// `s3://b/x/fused.zarr/0` becomes `s3://b/x/fused.zarr`. Paths without a
/// `.zarr/` component are returned unchanged.
pub fn normalize_zarr_root(uri: &str) -> String {
    match uri.find(".zarr/") {
        Some(idx) => uri[..idx + ".zarr".len()].to_string(),
        None => uri.to_string(),
    }
}

/// Whether a path names a single zarr array/group rather than a directory of them
pub fn is_single_zarr(uri: &str) -> bool {
    let trimmed = uri.trim_end_matches('/');
    trimmed.ends_with(".zarr") || trimmed.contains(".zarr/")
}

/// Pick the bucket and key a descriptor is uploaded to
///
/// An explicit key is used as given. Otherwise the descriptor lands next to
/// the dataset as `<parent>/process_output.json`.
pub fn upload_target(
    upload_bucket: &str,
    parent_directory: &str,
    explicit_key: Option<&str>,
) -> (String, String) {
    let key = match explicit_key {
        Some(key) => key.to_string(),
        None if parent_directory.is_empty() => DESCRIPTOR_FILE_NAME.to_string(),
        None => format!("{}/{}", parent_directory, DESCRIPTOR_FILE_NAME),
    };
    (upload_bucket.to_string(), key)
}

/// Build the viewer link that loads a descriptor from its uploaded location
pub fn uploaded_descriptor_link(
    viewer_base: &str,
    bucket: &str,
    key: &str,
    explicit_key: Option<&str>,
) -> String {
    if let Some(explicit) = explicit_key {
        let last = explicit.rsplit('/').next().unwrap_or_default();
        return if last.ends_with(".json") {
            format!("{}#!{}{}/{}", viewer_base, S3_SCHEME, bucket, explicit)
        } else {
            format!(
                "{}#!{}{}/{}/{}",
                viewer_base,
                S3_SCHEME,
                bucket,
                explicit.trim_end_matches('/'),
                DESCRIPTOR_FILE_NAME
            )
        };
    }

    match key.rsplit_once('/') {
        Some((dir, _)) => format!(
            "{}#!{}{}/{}/{}",
            viewer_base, S3_SCHEME, bucket, dir, DESCRIPTOR_FILE_NAME
        ),
        None => format!(
            "{}#!{}{}/{}",
            viewer_base, S3_SCHEME, bucket, DESCRIPTOR_FILE_NAME
        ),
    }
}
