//! The `generate` command: derive, generate, wait, upload, encode

use crate::cloud_handler;
use crate::progress::Progress;
use anyhow::{Context, Result};
use clap::Args;
use ng_link_core::descriptor::ENCODED_URL_FILE_NAME;
use ng_link_core::{
    generator_for, parse_s3_path, viewer_url, wait_for_descriptor, DatasetKind, Descriptor,
    LinkConfig,
};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Flags of the `generate` command; each one overrides the configuration file
#[derive(Args, Debug, Default)]
pub struct GenerateArgs {
    /// Dataset URI (s3://bucket/path/to/dataset.zarr)
    #[arg(long)]
    zarr_path: Option<String>,

    /// Lower bound of the intensity window
    #[arg(long, allow_negative_numbers = true)]
    vmin: Option<f64>,

    /// Upper bound of the intensity window
    #[arg(long, allow_negative_numbers = true)]
    vmax: Option<f64>,

    /// Layer opacity, 0 to 1
    #[arg(long)]
    opacity: Option<f64>,

    /// Layer blend mode
    #[arg(long)]
    blend: Option<String>,

    /// Directory the descriptor and encoded URL are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Dataset layout (auto, exaspim, hcr)
    #[arg(long)]
    dataset_type: Option<DatasetKind>,

    /// Bucket the descriptor's ng_link points at
    #[arg(long)]
    link_bucket: Option<String>,

    /// Upload the descriptor after generating it
    #[arg(long)]
    upload: bool,

    /// Bucket to upload the descriptor to (implies --upload)
    #[arg(long)]
    upload_bucket: Option<String>,

    /// Exact key to upload the descriptor to
    #[arg(long)]
    upload_key: Option<String>,

    /// Encode only the viewer state, without ng_link
    #[arg(long)]
    state_only: bool,

    /// Send unsigned S3 requests, for public buckets
    #[arg(long)]
    anonymous: bool,

    /// AWS region
    #[arg(long)]
    region: Option<String>,

    /// Custom S3 endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Read dataset metadata from a local mirror of the bucket instead of S3
    #[arg(long)]
    metadata_root: Option<PathBuf>,

    /// Seconds to wait for the descriptor to appear
    #[arg(long)]
    wait_timeout: Option<u64>,
}

impl GenerateArgs {
    /// Override `config` with every flag that was given
    pub fn apply(self, config: &mut LinkConfig) {
        if let Some(zarr_path) = self.zarr_path {
            config.dataset.zarr_path = Some(zarr_path);
        }
        if let Some(kind) = self.dataset_type {
            config.dataset.dataset_type = kind;
        }
        if let Some(vmin) = self.vmin {
            config.display.vmin = vmin;
        }
        if let Some(vmax) = self.vmax {
            config.display.vmax = vmax;
        }
        if let Some(opacity) = self.opacity {
            config.display.opacity = opacity;
        }
        if let Some(blend) = self.blend {
            config.display.blend = blend;
        }
        if let Some(dir) = self.output_dir {
            config.output.directory = dir;
        }
        if self.state_only {
            config.output.state_only = true;
        }
        if let Some(secs) = self.wait_timeout {
            config.output.wait_timeout_secs = secs;
        }
        if let Some(bucket) = self.link_bucket {
            config.viewer.link_bucket = bucket;
        }
        if self.upload && config.storage.upload_bucket.is_none() {
            config.storage.upload_bucket = Some(config.viewer.link_bucket.clone());
        }
        if let Some(bucket) = self.upload_bucket {
            config.storage.upload_bucket = Some(bucket);
        }
        if let Some(key) = self.upload_key {
            config.storage.upload_key = Some(key);
        }
        if self.anonymous {
            config.storage.anonymous = true;
        }
        if let Some(region) = self.region {
            config.storage.region = Some(region);
        }
        if let Some(endpoint) = self.endpoint {
            config.storage.endpoint = Some(endpoint);
        }
        if let Some(root) = self.metadata_root {
            config.storage.metadata_root = Some(root);
        }
    }
}

/// Run the whole pipeline and return the encoded viewer URL
pub fn run_generate(config: &LinkConfig, show_progress: bool) -> Result<String> {
    let request = config.link_request()?;
    let location = parse_s3_path(&request.zarr_path)?;

    info!("Dataset: {}", request.zarr_path);
    info!("Bucket: {}", location.bucket());
    info!("Dataset name: {}", request.dataset_name);
    info!(
        "Display: vmin={} vmax={} opacity={} blend={}",
        request.vmin, request.vmax, request.opacity, request.blend
    );
    info!("Output directory: {:?}", request.output_dir);

    fs::create_dir_all(&request.output_dir).with_context(|| {
        format!("Failed to create output directory {:?}", request.output_dir)
    })?;

    let progress = Progress::new(show_progress);
    let spinner = progress.spinner("Reading dataset metadata...");

    let source = cloud_handler::metadata_source(config, location.bucket())?;
    let generator = generator_for(config.dataset.dataset_type, source, &location);
    info!("Using {} generator", generator.name());

    progress.set_message(&spinner, "Generating viewer state...");
    generator
        .generate(&request)
        .with_context(|| format!("Link generation failed for {}", request.zarr_path))?;

    let descriptor_path = wait_for_descriptor(&request.output_dir, config.wait_timeout())?;
    info!("Descriptor written to {:?}", descriptor_path);

    if config.storage.upload_bucket.is_some() {
        progress.set_message(&spinner, "Uploading descriptor...");
        cloud_handler::upload_from_config(config, &location, &descriptor_path);
    }

    progress.finish(spinner);

    let descriptor = Descriptor::load(&descriptor_path)?;
    let state = if config.output.state_only {
        descriptor.state_without_link()
    } else {
        descriptor.into_value()
    };
    let url = viewer_url(&config.viewer.base_url, &state)?;

    let url_path = request.output_dir.join(ENCODED_URL_FILE_NAME);
    if let Err(e) = fs::write(&url_path, &url) {
        warn!("Could not save encoded URL to {:?}: {}", url_path, e);
    }

    Ok(url)
}
