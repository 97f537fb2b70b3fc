//! Cloud storage handler for ng-link-cli
//!
//! Builds the metadata source a generator reads from and performs the
//! optional descriptor upload. Upload failures are reported and swallowed.

use anyhow::{Context, Result};
use ng_link_cloud::{CloudStore, ObjectStoreSource, S3Options, UploadError, Uploader};
use ng_link_core::s3_path::{upload_target, uploaded_descriptor_link};
use ng_link_core::{Descriptor, LinkConfig, LocalMetadataSource, MetadataSource, S3Location};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// S3 connection options from the `[storage]` section
pub fn s3_options(config: &LinkConfig) -> S3Options {
    S3Options {
        region: config.storage.region.clone(),
        endpoint: config.storage.endpoint.clone(),
        anonymous: config.storage.anonymous,
    }
}

/// Where the dataset metadata for `bucket` is read from
///
/// A configured `metadata_root` is treated as a local mirror of the bucket.
pub fn metadata_source(config: &LinkConfig, bucket: &str) -> Result<Arc<dyn MetadataSource>> {
    if let Some(root) = &config.storage.metadata_root {
        info!("Reading metadata from local mirror {:?}", root);
        return Ok(Arc::new(LocalMetadataSource::new(root)));
    }

    let store = CloudStore::s3(bucket, &s3_options(config))
        .with_context(|| format!("Failed to connect to bucket {}", bucket))?;
    Ok(Arc::new(ObjectStoreSource::new(store)))
}

/// Upload the descriptor as configured, logging instead of failing
pub fn upload_from_config(config: &LinkConfig, location: &S3Location, descriptor_path: &Path) {
    let Some(bucket) = config.storage.upload_bucket.as_deref() else {
        return;
    };

    match Uploader::s3(bucket, &s3_options(config)) {
        Ok(uploader) => {
            upload_descriptor(&uploader, config, location, descriptor_path);
        }
        Err(e) => warn!("Upload skipped: {}", describe_upload_error(&e)),
    }
}

/// Upload `descriptor_path` and point its `ng_link` at the uploaded copy
///
/// Returns the new link, or `None` if the upload failed.
pub fn upload_descriptor(
    uploader: &Uploader,
    config: &LinkConfig,
    location: &S3Location,
    descriptor_path: &Path,
) -> Option<String> {
    let explicit_key = config.storage.upload_key.as_deref();
    let (bucket, key) = upload_target(uploader.bucket(), location.parent_directory(), explicit_key);

    info!("Uploading descriptor to s3://{}/{}", bucket, key);
    if let Err(e) = uploader.upload_file(descriptor_path, &key) {
        warn!("Upload failed: {}", describe_upload_error(&e));
        return None;
    }

    let link = uploaded_descriptor_link(&config.viewer.base_url, &bucket, &key, explicit_key);
    if let Err(e) = rewrite_link(descriptor_path, &link) {
        warn!("Could not update ng_link in {:?}: {}", descriptor_path, e);
    }
    Some(link)
}

fn rewrite_link(descriptor_path: &Path, link: &str) -> ng_link_core::Result<()> {
    let mut descriptor = Descriptor::load(descriptor_path)?;
    descriptor.set_ng_link(link)?;
    descriptor.save(descriptor_path)?;
    debug!("ng_link now {}", link);
    Ok(())
}

/// A one-line explanation with a hint on how to fix it
pub fn describe_upload_error(err: &UploadError) -> String {
    match err {
        UploadError::Credentials(_) => format!(
            "{} (check AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY and AWS_REGION)",
            err
        ),
        UploadError::Permission { .. } => {
            format!("{} (the credentials cannot write to this bucket)", err)
        }
        _ => err.to_string(),
    }
}
