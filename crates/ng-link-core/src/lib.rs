//! ng-link - Neuroglancer link builder for OME-Zarr datasets in object storage
//!
//! This library parses dataset URIs, builds Neuroglancer viewer states from
//! OME-Zarr metadata, and turns a saved state into a shareable viewer URL.

pub mod config;
pub mod descriptor;
pub mod encode;
pub mod error;
pub mod generator;
pub mod s3_path;
pub mod source;
pub mod zarr;

pub use error::{Error, Result};

// Re-export commonly used types
pub use config::LinkConfig;
pub use descriptor::{wait_for_descriptor, Descriptor, DESCRIPTOR_FILE_NAME};
pub use encode::{encode_descriptor_file, encode_state, viewer_url, DEFAULT_VIEWER_BASE};
pub use generator::{generator_for, DatasetKind, LinkGenerator, LinkRequest};
pub use s3_path::{parse_s3_path, S3Location};
pub use source::{LocalMetadataSource, MetadataSource};
