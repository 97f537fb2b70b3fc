//! ExaSPIM layout: one multiscale volume, one image layer

use super::state::{
    channel_dimension, descriptor_link, invlerp_shader, layer_name, meters, normalized_range,
    time_dimension, write_descriptor, zarr_source,
};
use super::{LinkGenerator, LinkRequest};
use crate::s3_path::{normalize_zarr_root, parse_s3_path};
use crate::source::MetadataSource;
use crate::zarr::ZarrImage;
use crate::Result;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

const LAYER_COLOR: &str = "#ffffff";

/// Builds the viewer state for a single ExaSPIM OME-Zarr volume
pub struct ExaspimLinkGenerator {
    source: Arc<dyn MetadataSource>,
}

impl ExaspimLinkGenerator {
    /// Generator reading metadata from `source`
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self { source }
    }

    /// Build the state without writing it
    pub fn build_state(&self, request: &LinkRequest) -> Result<Value> {
        let zarr_path = normalize_zarr_root(&request.zarr_path);
        if zarr_path != request.zarr_path {
            debug!("Using zarr root {} for {}", zarr_path, request.zarr_path);
        }
        let location = parse_s3_path(&zarr_path)?;

        info!("Reading OME-Zarr metadata from {}", location);
        let image = ZarrImage::read(self.source.as_ref(), location.key())?;
        let voxel = image.multiscale.voxel_size()?;
        debug!(
            "Voxel size: x={:e} m, y={:e} m, z={:e} m",
            voxel.x, voxel.y, voxel.z
        );

        let name = layer_name(location.dataset_name());
        let mut layer = json!({
            "type": "image",
            "source": zarr_source(&zarr_path),
        });
        if image.multiscale.has_channel_axis() {
            layer["localDimensions"] = json!({"c'": channel_dimension()});
        }
        if let Some(fields) = layer.as_object_mut() {
            fields.insert(
                "shaderControls".to_string(),
                normalized_range(request.vmin, request.vmax),
            );
            fields.insert("shader".to_string(), json!(invlerp_shader(LAYER_COLOR)));
            fields.insert("visible".to_string(), json!(true));
            fields.insert("opacity".to_string(), json!(request.opacity));
            fields.insert("name".to_string(), json!(name));
            fields.insert("blend".to_string(), json!(request.blend));
        }

        let mut state = json!({
            "dimensions": {
                "x": meters(voxel.x),
                "y": meters(voxel.y),
                "z": meters(voxel.z),
                "t": time_dimension(),
            },
        });
        if let Some([x, y, z]) = image.center() {
            state["position"] = json!([x, y, z, 0.5]);
        }
        if let Some(fields) = state.as_object_mut() {
            fields.insert("layers".to_string(), json!([layer]));
            fields.insert(
                "selectedLayer".to_string(),
                json!({"visible": true, "layer": name}),
            );
            fields.insert("layout".to_string(), json!("4panel"));
        }

        Ok(state)
    }
}

impl LinkGenerator for ExaspimLinkGenerator {
    fn name(&self) -> &'static str {
        "exaspim"
    }

    fn generate(&self, request: &LinkRequest) -> Result<()> {
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
