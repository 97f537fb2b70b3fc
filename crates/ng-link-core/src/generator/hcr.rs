//! HCR layout: one layer per `channel_*.zarr`, additive blending

use super::state::{
    channel_dimension, descriptor_link, invlerp_shader, layer_name, meters, normalized_range,
    time_dimension, write_descriptor, zarr_source,
};
use super::{LinkGenerator, LinkRequest};
use crate::s3_path::{is_single_zarr, normalize_zarr_root, parse_s3_path};
use crate::source::MetadataSource;
use crate::zarr::{Axis, VoxelSize, ZarrImage};
use crate::{Error, Result};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// HCR layers are always fully opaque
pub const HCR_OPACITY: f64 = 1.0;
/// HCR channels are overlaid additively
pub const HCR_BLEND: &str = "additive";

const MULTI_CHANNEL_COLOR: &str = "#690afe";
const SINGLE_CHANNEL_COLOR: &str = "#59d5f8";
const DEFAULT_CHANNEL: &str = "488";

/// Voxel size of fused multi-channel HCR volumes
const MULTI_CHANNEL_VOXEL: VoxelSize = VoxelSize {
    x: 2.3371543469894166e-07,
    y: 2.3371543469894166e-07,
    z: 1e-06,
};

/// Used when a single-channel volume's metadata cannot be read
const FALLBACK_VOXEL: VoxelSize = VoxelSize {
    x: 9.201793828644069e-08,
    y: 9.201793828644069e-08,
    z: 4.4860451398192966e-07,
};

/// Builds viewer states for HCR datasets
pub struct HcrLinkGenerator {
    source: Arc<dyn MetadataSource>,
}

impl HcrLinkGenerator {
    /// Generator reading metadata and listings from `source`
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self { source }
    }

    /// Build the state without writing it
    ///
    /// A path naming a single zarr gets one layer with metadata-derived
    /// dimensions; a directory gets one layer per `.zarr` folder inside it.
    pub fn build_state(&self, request: &LinkRequest) -> Result<Value> {
        let (dimensions, layers) = if is_single_zarr(&request.zarr_path) {
            info!("Processing single zarr file in HCR format");
            self.single_channel(request)?
        } else {
            self.multi_channel(request)?
        };

        Ok(json!({
            "dimensions": dimensions,
            "layers": layers,
            "showAxisLines": false,
            "showScaleBar": false,
        }))
    }

    fn multi_channel(&self, request: &LinkRequest) -> Result<(Value, Vec<Value>)> {
        let location = parse_s3_path(&request.zarr_path)?;
        let folders = self.source.list_zarr_folders(location.key())?;
        if folders.is_empty() {
            return Err(Error::Generator(format!(
                "No .zarr folders found in {}",
                request.zarr_path
            )));
        }
        info!("Found {} .zarr folders: {:?}", folders.len(), folders);

        let dimensions = json!({
            "x": meters(MULTI_CHANNEL_VOXEL.x),
            "y": meters(MULTI_CHANNEL_VOXEL.y),
            "z": meters(MULTI_CHANNEL_VOXEL.z),
            "c'": channel_dimension(),
            "t": time_dimension(),
        });

        let base = request.zarr_path.trim_end_matches('/');
        let layers = folders
            .iter()
            .map(|folder| {
                hcr_layer(
                    json!(zarr_source(&format!("{}/{}", base, folder))),
                    channel_display_name(folder),
                    MULTI_CHANNEL_COLOR,
                    request,
                )
            })
            .collect();

        Ok((dimensions, layers))
    }

    fn single_channel(&self, request: &LinkRequest) -> Result<(Value, Vec<Value>)> {
        let location = parse_s3_path(&normalize_zarr_root(&request.zarr_path))?;

        let (voxel, axes) = match ZarrImage::read(self.source.as_ref(), location.key())
            .and_then(|image| {
                let voxel = image.multiscale.voxel_size()?;
                let rank = image.multiscale.level0_scale().map(|s| s.len()).unwrap_or(5);
                Ok((voxel, image.multiscale.effective_axes(rank)))
            }) {
            Ok(found) => found,
            Err(e) => {
                warn!("Could not extract zarr metadata: {}", e);
                (FALLBACK_VOXEL, default_axes())
            }
        };
        let channel = channel_from_path(&request.zarr_path);
        debug!("Single HCR channel {} with voxel size {:?}", channel, voxel);

        let dimensions = json!({
            "x": meters(voxel.x),
            "y": meters(voxel.y),
            "z": meters(voxel.z),
            "c'": channel_dimension(),
            "t": time_dimension(),
        });

        let mut output_dimensions = Map::new();
        for axis in &axes {
            let (name, dim) = match axis.name.as_str() {
                "x" => ("x", meters(voxel.x)),
                "y" => ("y", meters(voxel.y)),
                "z" => ("z", meters(voxel.z)),
                "c" => ("c'", channel_dimension()),
                "t" => ("t", time_dimension()),
                other => {
                    debug!("Skipping unknown axis {} in output dimensions", other);
                    continue;
                }
            };
            output_dimensions.insert(name.to_string(), dim);
        }

        let source = json!([{
            "url": zarr_source(&request.zarr_path),
            "transform": {
                "matrix": identity_transform(output_dimensions.len()),
                "outputDimensions": output_dimensions,
            }
        }]);
        let layer = hcr_layer(
            source,
            format!("CH_{}", channel),
            SINGLE_CHANNEL_COLOR,
            request,
        );

        Ok((dimensions, vec![layer]))
    }
}

impl LinkGenerator for HcrLinkGenerator {
    fn name(&self) -> &'static str {
        "hcr"
    }

    fn generate(&self, request: &LinkRequest) -> Result<()> {
        if request.opacity != HCR_OPACITY || request.blend != HCR_BLEND {
            debug!(
                "HCR layers use opacity {} and blend '{}', ignoring requested {} / '{}'",
                HCR_OPACITY, HCR_BLEND, request.opacity, request.blend
            );
        }
        let state = self.build_state(request)?;
        let ng_link = descriptor_link(
            &request.viewer_base,
            &request.link_bucket,
            &request.dataset_name,
        );
        info!("Descriptor link: {}", ng_link);
        write_descriptor(&request.output_dir, ng_link, state)?;
        Ok(())
    }
}

fn hcr_layer(source: Value, name: String, color: &str, request: &LinkRequest) -> Value {
    json!({
        "type": "image",
        "source": source,
        "localDimensions": {"c'": channel_dimension()},
        "shaderControls": normalized_range(request.vmin, request.vmax),
        "shader": invlerp_shader(color),
        "visible": true,
        "opacity": HCR_OPACITY,
        "name": name,
        "blend": HCR_BLEND,
    })
}

/// `channel_405.zarr` becomes `CH_405`, anything else its upper-cased stem
pub fn channel_display_name(folder: &str) -> String {
    match folder
        .strip_prefix("channel_")
        .and_then(|rest| rest.strip_suffix(".zarr"))
    {
        Some(channel) => format!("CH_{}", channel),
        None => layer_name(folder).to_uppercase(),
    }
}

/// Wavelength from a `.../channel_<n>.zarr/...` path, `488` when absent
pub fn channel_from_path(path: &str) -> String {
    path.split_once("channel_")
        .map(|(_, rest)| rest)
        .and_then(|rest| rest.split(".zarr").next())
        .and_then(|rest| rest.split('/').next())
        .filter(|channel| !channel.is_empty())
        .unwrap_or(DEFAULT_CHANNEL)
        .to_string()
}

fn default_axes() -> Vec<Axis> {
    ["t", "c", "z", "y", "x"]
        .iter()
        .map(|name| Axis {
            name: name.to_string(),
            kind: None,
            unit: None,
        })
        .collect()
}

/// `rank x (rank + 1)` affine with an identity linear part and zero translation
fn identity_transform(rank: usize) -> Value {
    let rows: Vec<Vec<f64>> = (0..rank)
        .map(|row| {
            (0..=rank)
                .map(|col| if row == col { 1.0 } else { 0.0 })
                .collect()
        })
        .collect();
    json!(rows)
}
