//! Configuration module
//!
//! Run parameters live in a [`LinkConfig`]. Values come from the built-in
//! defaults, then an optional TOML file, then command-line flags.

use crate::encode::DEFAULT_VIEWER_BASE;
use crate::generator::{DatasetKind, LinkRequest};
use crate::s3_path::parse_s3_path;
use crate::{Error, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Bucket the descriptor link points at when no upload bucket is given
pub const DEFAULT_LINK_BUCKET: &str = "aind-open-data";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LinkConfig {
    /// Dataset selection
    pub dataset: DatasetConfig,
    /// Display parameters of the generated layers
    pub display: DisplayConfig,
    /// Local output settings
    pub output: OutputConfig,
    /// Viewer deployment settings
    pub viewer: ViewerConfig,
    /// Object-storage settings
    pub storage: StorageConfig,
}

/// Dataset selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DatasetConfig {
    /// Dataset URI (`s3://bucket/path/to/dataset.zarr`)
    pub zarr_path: Option<String>,
    /// Layout to generate
    pub dataset_type: DatasetKind,
}

/// Display parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Lower intensity bound
    pub vmin: f64,
    /// Upper intensity bound
    pub vmax: f64,
    /// Layer opacity in [0, 1]
    pub opacity: f64,
    /// Neuroglancer blend mode
    pub blend: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            vmin: 0.0,
            vmax: 200.0,
            opacity: 0.5,
            blend: "default".to_string(),
        }
    }
}

/// Output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the descriptor and encoded URL are written to
    pub directory: PathBuf,
    /// Leave the descriptor's `ng_link` out of the encoded state
    pub state_only: bool,
    /// Seconds to wait for the generator's descriptor to appear
    pub wait_timeout_secs: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("results"),
            state_only: false,
            wait_timeout_secs: 10,
        }
    }
}

/// Viewer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Viewer deployment the link opens
    pub base_url: String,
    /// Bucket the descriptor's `ng_link` points at when nothing is uploaded
    pub link_bucket: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_VIEWER_BASE.to_string(),
            link_bucket: DEFAULT_LINK_BUCKET.to_string(),
        }
    }
}

/// Object-storage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// AWS region, taken from the environment when unset
    pub region: Option<String>,
    /// Custom S3-compatible endpoint
    pub endpoint: Option<String>,
    /// Read dataset metadata without signing requests (public buckets)
    pub anonymous: bool,
    /// Bucket to upload the descriptor to; no upload when unset
    pub upload_bucket: Option<String>,
    /// Exact key to upload to; derived from the dataset path when unset
    pub upload_key: Option<String>,
    /// Read metadata from a local mirror of the dataset bucket instead of S3
    pub metadata_root: Option<PathBuf>,
}

impl LinkConfig {
    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir().ok_or_else(|| {
            Error::Config("Unable to determine config directory".to_string())
        })?;

        Ok(config_dir.join("ng-link").join("config.toml"))
    }

    /// Get default configuration content with examples
    pub fn default_config_content() -> String {
        r#"# ng-link configuration file
# Command-line flags override every value here.

[dataset]
# zarr_path = "s3://aind-open-data/exaSPIM_000000/SPIM.ome.zarr"
# Layout to generate: auto, exaspim, hcr
dataset_type = "auto"

[display]
vmin = 0.0
vmax = 200.0
opacity = 0.5
blend = "default"

[output]
directory = "results"
# Encode only the viewer state, without the descriptor's ng_link entry
state_only = false
wait_timeout_secs = 10

[viewer]
base_url = "https://neuroglancer-demo.appspot.com/"
link_bucket = "aind-open-data"

[storage]
# region = "us-west-2"
# endpoint = "http://localhost:9000"
anonymous = false
# upload_bucket = "my-bucket"
# upload_key = "output/NG_out.json"
# metadata_root = "/mnt/mirror/aind-open-data"
"#
        .to_string()
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: LinkConfig = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Load the user configuration file, or defaults when there is none
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Save configuration to a file, creating its directory
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    /// How long to wait for a generator's descriptor
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.output.wait_timeout_secs)
    }

    /// Bucket the descriptor's `ng_link` should point at
    ///
    /// The upload bucket when one is set, since that is where the
    /// descriptor will live.
    pub fn link_bucket(&self) -> &str {
        self.storage
            .upload_bucket
            .as_deref()
            .unwrap_or(&self.viewer.link_bucket)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        let display = &self.display;
        if !display.vmin.is_finite() || !display.vmax.is_finite() {
            return Err(Error::Config("vmin and vmax must be finite".to_string()));
        }
        if display.vmin >= display.vmax {
            return Err(Error::Config(format!(
                "vmin ({}) must be smaller than vmax ({})",
                display.vmin, display.vmax
            )));
        }
        if !(0.0..=1.0).contains(&display.opacity) {
            return Err(Error::Config(format!(
                "opacity must be between 0 and 1, got {}",
                display.opacity
            )));
        }
        if display.blend.trim().is_empty() {
            return Err(Error::Config("blend mode must not be empty".to_string()));
        }
        Ok(())
    }

    /// Build the generator request for the configured dataset
    pub fn link_request(&self) -> Result<LinkRequest> {
        self.validate()?;
        let zarr_path = self
            .dataset
            .zarr_path
            .clone()
            .ok_or_else(|| Error::Config("no dataset path given".to_string()))?;
        let location = parse_s3_path(&zarr_path)?;

        Ok(LinkRequest {
            zarr_path,
            vmin: self.display.vmin,
            vmax: self.display.vmax,
            opacity: self.display.opacity,
            blend: self.display.blend.clone(),
            output_dir: self.output.directory.clone(),
            dataset_name: location.parent_directory().to_string(),
            link_bucket: self.link_bucket().to_string(),
            viewer_base: self.viewer.base_url.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = LinkConfig::default();
        assert_eq!(config.display.vmin, 0.0);
        assert_eq!(config.display.vmax, 200.0);
        assert_eq!(config.display.opacity, 0.5);
        assert_eq!(config.display.blend, "default");
        assert_eq!(config.output.directory, PathBuf::from("results"));
        assert_eq!(config.viewer.base_url, "https://neuroglancer-demo.appspot.com/");
        assert_eq!(config.dataset.dataset_type, DatasetKind::Auto);
        assert!(config.storage.upload_bucket.is_none());
    }

    #[test]
    fn test_default_content_matches_defaults() {
        let config: LinkConfig = toml::from_str(&LinkConfig::default_config_content()).unwrap();
        assert_eq!(config, LinkConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: LinkConfig = toml::from_str(
            r#"
            [display]
            vmax = 400.0

            [dataset]
            dataset_type = "hcr"
            "#,
        )
        .unwrap();
        assert_eq!(config.display.vmax, 400.0);
        assert_eq!(config.display.opacity, 0.5);
        assert_eq!(config.dataset.dataset_type, DatasetKind::Hcr);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/config.toml");

        let mut config = LinkConfig::default();
        config.storage.upload_bucket = Some("martin-test-bucket".to_string());
        config.save_to(&path).unwrap();

        assert_eq!(LinkConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_load_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[display\nvmin = ").unwrap();
        assert!(matches!(LinkConfig::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate() {
        let mut config = LinkConfig::default();
        assert!(config.validate().is_ok());

        config.display.opacity = 1.5;
        assert!(config.validate().is_err());

        config.display.opacity = 1.0;
        config.display.vmin = 300.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_link_request() {
        let mut config = LinkConfig::default();
        assert!(matches!(config.link_request(), Err(Error::Config(_))));

        config.dataset.zarr_path = Some("s3://bucket-x/a/b/dataset.zarr".to_string());
        let request = config.link_request().unwrap();
        assert_eq!(request.dataset_name, "a/b");
        assert_eq!(request.link_bucket, "aind-open-data");

        config.storage.upload_bucket = Some("up".to_string());
        assert_eq!(config.link_request().unwrap().link_bucket, "up");

        config.dataset.zarr_path = Some("gs://bucket-x/a".to_string());
        assert!(matches!(config.link_request(), Err(Error::InvalidUri(_))));
    }
}
