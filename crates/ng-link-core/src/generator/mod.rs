//! Viewer-state generators
//!
//! A generator is handed a [`LinkRequest`] and writes `process_output.json`
//! into the request's output directory. Callers do not consume anything it
//! returns beyond success or failure; they wait for the file with
//! [`crate::descriptor::wait_for_descriptor`] and read it back.

pub mod exaspim;
pub mod hcr;
pub mod state;

pub use exaspim::ExaspimLinkGenerator;
pub use hcr::HcrLinkGenerator;

use crate::s3_path::{is_single_zarr, S3Location};
use crate::source::MetadataSource;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything a generator needs to build a viewer state
#[derive(Debug, Clone, PartialEq)]
pub struct LinkRequest {
    /// Dataset URI (`s3://bucket/path/to/dataset.zarr`)
    pub zarr_path: String,
    /// Lower bound of the display intensity range
    pub vmin: f64,
    /// Upper bound of the display intensity range
    pub vmax: f64,
    /// Layer opacity in [0, 1]
    pub opacity: f64,
    /// Neuroglancer blend mode
    pub blend: String,
    /// Directory the descriptor is written into
    pub output_dir: PathBuf,
    /// Label recorded in the descriptor's `ng_link`, normally the dataset's parent directory
    pub dataset_name: String,
    /// Bucket the descriptor's `ng_link` points at
    pub link_bucket: String,
    /// Viewer deployment used in `ng_link`
    pub viewer_base: String,
}

/// Something that turns a dataset into a descriptor on disk
pub trait LinkGenerator {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Write `process_output.json` for `request` into `request.output_dir`
    fn generate(&self, request: &LinkRequest) -> Result<()>;
}

/// Which layout to build a state for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    /// Pick by looking at the dataset
    #[default]
    Auto,
    /// Single multiscale volume
    Exaspim,
    /// One or more `channel_*.zarr` volumes
    Hcr,
}

impl FromStr for DatasetKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(DatasetKind::Auto),
            "exaspim" => Ok(DatasetKind::Exaspim),
            "hcr" => Ok(DatasetKind::Hcr),
            other => Err(Error::Config(format!(
                "unknown dataset type '{}', expected auto, exaspim or hcr",
                other
            ))),
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DatasetKind::Auto => "auto",
            DatasetKind::Exaspim => "exaspim",
            DatasetKind::Hcr => "hcr",
        };
        f.write_str(name)
    }
}

/// Decide between ExaSPIM and HCR for a dataset
///
/// A prefix holding more than one `.zarr` folder, or any `channel_*` folder,
/// is HCR. Listing failures are logged and fall back to ExaSPIM.
pub fn detect_dataset_kind(source: &dyn MetadataSource, location: &S3Location) -> DatasetKind {
    if is_single_zarr(location.key()) {
        debug!("{} names a single zarr, using ExaSPIM layout", location);
        return DatasetKind::Exaspim;
    }

    match source.list_zarr_folders(location.key()) {
        Ok(folders) => {
            debug!("Found {} .zarr folders under {}", folders.len(), location);
            if folders.len() > 1 || folders.iter().any(|f| f.starts_with("channel_")) {
                DatasetKind::Hcr
            } else {
                DatasetKind::Exaspim
            }
        }
        Err(e) => {
            warn!("Could not check for HCR dataset: {}", e);
            DatasetKind::Exaspim
        }
    }
}

/// Resolve `Auto` and build the matching generator
pub fn generator_for(
    kind: DatasetKind,
    source: Arc<dyn MetadataSource>,
    location: &S3Location,
) -> Box<dyn LinkGenerator> {
    let kind = match kind {
        DatasetKind::Auto => detect_dataset_kind(source.as_ref(), location),
        other => other,
    };
    match kind {
        DatasetKind::Hcr => Box::new(HcrLinkGenerator::new(source)),
        _ => Box::new(ExaspimLinkGenerator::new(source)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s3_path::parse_s3_path;
    use serde_json::Value;

    struct Listing(std::result::Result<Vec<&'static str>, &'static str>);

    impl MetadataSource for Listing {
        fn read_json(&self, _key: &str) -> Result<Option<Value>> {
            Ok(None)
        }

        fn list_zarr_folders(&self, _prefix: &str) -> Result<Vec<String>> {
            match &self.0 {
                Ok(names) => Ok(names.iter().map(|n| n.to_string()).collect()),
                Err(msg) => Err(Error::Storage(msg.to_string())),
            }
        }
    }

    fn detect(listing: Listing, uri: &str) -> DatasetKind {
        detect_dataset_kind(&listing, &parse_s3_path(uri).unwrap())
    }

    #[test]
    fn test_detect_multi_channel() {
        let listing = Listing(Ok(vec!["channel_405.zarr", "channel_488.zarr"]));
        assert_eq!(detect(listing, "s3://b/HCR_1/fused"), DatasetKind::Hcr);
    }

    #[test]
    fn test_detect_single_channel_folder() {
        let listing = Listing(Ok(vec!["channel_488.zarr"]));
        assert_eq!(detect(listing, "s3://b/HCR_1/fused"), DatasetKind::Hcr);
    }

    #[test]
    fn test_detect_plain_dataset() {
        assert_eq!(detect(Listing(Ok(vec![])), "s3://b/exa/flat"), DatasetKind::Exaspim);
        assert_eq!(
            detect(Listing(Ok(vec!["SPIM.ome.zarr"])), "s3://b/exa"),
            DatasetKind::Exaspim
        );
    }

    #[test]
    fn test_detect_single_zarr_skips_listing() {
        let listing = Listing(Ok(vec!["a.zarr", "b.zarr"]));
        assert_eq!(detect(listing, "s3://b/exa/SPIM.ome.zarr"), DatasetKind::Exaspim);
    }

    #[test]
    fn test_detect_listing_failure_falls_back() {
        assert_eq!(
            detect(Listing(Err("access denied")), "s3://b/HCR_1/fused"),
            DatasetKind::Exaspim
        );
    }

    #[test]
    fn test_dataset_kind_parsing() {
        assert_eq!("auto".parse::<DatasetKind>().unwrap(), DatasetKind::Auto);
        assert_eq!("HCR".parse::<DatasetKind>().unwrap(), DatasetKind::Hcr);
        assert_eq!("exaspim".parse::<DatasetKind>().unwrap(), DatasetKind::Exaspim);
        assert!("confocal".parse::<DatasetKind>().is_err());
        assert_eq!(DatasetKind::Hcr.to_string(), "hcr");
    }
}
