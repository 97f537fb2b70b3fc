//! # ng-link-cloud
//!
//! Object-storage layer for ng-link. It gives the synchronous core library
//! blocking access to S3: reading OME-Zarr metadata, listing `.zarr`
//! folders, and uploading descriptors.
//!
//! ## Architecture
//!
//! The main abstractions are:
//! - `CloudStore`: an `object_store` handle bound to one bucket
//! - `ObjectStoreSource`: implements `ng_link_core::MetadataSource` over a `CloudStore`
//! - `Uploader`: puts local files into a bucket, reporting typed `UploadError`s
//!
//! All of them drive the async `object_store` API from an internal Tokio runtime.

#![warn(missing_debug_implementations)]

mod error;
mod runtime;
mod source;
mod store;
mod upload;

pub use error::{CloudError, Result, UploadError};
pub use source::ObjectStoreSource;
pub use store::{CloudStore, S3Options, DEFAULT_REGION};
pub use upload::{upload_to_s3, Uploader};

// Re-export commonly used types from object_store
pub use object_store::{path::Path as ObjectPath, ObjectStore};
