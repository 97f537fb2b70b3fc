//! Pieces shared by the viewer-state generators

use crate::descriptor::{descriptor_path, Descriptor, DESCRIPTOR_FILE_NAME, NG_LINK_KEY};
use crate::s3_path::S3_SCHEME;
use crate::Result;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::info;

/// Time axis unit step Neuroglancer uses for single-timepoint volumes
pub const TIME_STEP_SECONDS: f64 = 0.001;

/// Shader with a colour picker and an `invlerp` intensity control
pub fn invlerp_shader(color: &str) -> String {
    format!(
        "#uicontrol vec3 color color(default=\"{}\")\n#uicontrol invlerp normalized\nvoid main() {{\nemitRGB(color * normalized());\n}}",
        color
    )
}

/// `[value, "m"]`
pub fn meters(value: f64) -> Value {
    json!([value, "m"])
}

/// `[0.001, "s"]`
pub fn time_dimension() -> Value {
    json!([TIME_STEP_SECONDS, "s"])
}

/// `[1, ""]`, the unitless local channel dimension
pub fn channel_dimension() -> Value {
    json!([1, ""])
}

/// `shaderControls` carrying the display range
pub fn normalized_range(vmin: f64, vmax: f64) -> Value {
    json!({"normalized": {"range": [vmin, vmax]}})
}

/// Neuroglancer source string for a dataset URI
pub fn zarr_source(uri: &str) -> String {
    let uri = uri.trim_end_matches('/');
    if uri.starts_with(S3_SCHEME) {
        format!("zarr://{}", uri)
    } else {
        format!("zarr://{}{}", S3_SCHEME, uri)
    }
}

/// Link that loads the descriptor from `s3://<bucket>/<dataset_name>/process_output.json`
pub fn descriptor_link(viewer_base: &str, bucket: &str, dataset_name: &str) -> String {
    let dataset_name = dataset_name.trim_matches('/');
    if dataset_name.is_empty() {
        format!("{}#!{}{}/{}", viewer_base, S3_SCHEME, bucket, DESCRIPTOR_FILE_NAME)
    } else {
        format!(
            "{}#!{}{}/{}/{}",
            viewer_base, S3_SCHEME, bucket, dataset_name, DESCRIPTOR_FILE_NAME
        )
    }
}

/// Layer display name for a zarr folder: `SPIM.ome.zarr` becomes `SPIM`
pub fn layer_name(zarr_name: &str) -> String {
    let name = zarr_name.trim_end_matches('/');
    let name = name.strip_suffix(".zarr").unwrap_or(name);
    name.strip_suffix(".ome").unwrap_or(name).to_string()
}

/// Prefix `state` with its `ng_link` and write it as the descriptor
pub fn write_descriptor(output_dir: &Path, ng_link: String, state: Value) -> Result<PathBuf> {
    let mut fields = Map::new();
    fields.insert(NG_LINK_KEY.to_string(), Value::String(ng_link));
    if let Value::Object(state) = state {
        fields.extend(state);
    }

    let path = descriptor_path(output_dir);
    Descriptor::new(Value::Object(fields)).save(&path)?;
    info!("Wrote viewer state to {:?}", path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_invlerp_shader() {
        assert_eq!(
            invlerp_shader("#690afe"),
            "#uicontrol vec3 color color(default=\"#690afe\")\n#uicontrol invlerp normalized\nvoid main() {\nemitRGB(color * normalized());\n}"
        );
    }

    #[test]
    fn test_zarr_source() {
        assert_eq!(zarr_source("s3://b/x.zarr/"), "zarr://s3://b/x.zarr");
        assert_eq!(zarr_source("b/x.zarr"), "zarr://s3://b/x.zarr");
    }

    #[test]
    fn test_descriptor_link() {
        let viewer = "https://neuroglancer-demo.appspot.com/";
        assert_eq!(
            descriptor_link(viewer, "aind-open-data", "exa/flat"),
            "https://neuroglancer-demo.appspot.com/#!s3://aind-open-data/exa/flat/process_output.json"
        );
        assert_eq!(
            descriptor_link(viewer, "aind-open-data", ""),
            "https://neuroglancer-demo.appspot.com/#!s3://aind-open-data/process_output.json"
        );
    }

    #[test]
    fn test_layer_name() {
        assert_eq!(layer_name("SPIM.ome.zarr"), "SPIM");
        assert_eq!(layer_name("fused.zarr"), "fused");
        assert_eq!(layer_name("fused"), "fused");
    }

    #[test]
    fn test_write_descriptor_puts_link_first() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_descriptor(
            temp_dir.path(),
            "https://v/#!s3://b/process_output.json".to_string(),
            json!({"layers": [], "layout": "4panel"}),
        )
        .unwrap();

        let descriptor = Descriptor::load(&path).unwrap();
        let keys: Vec<&String> = descriptor.value().as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["ng_link", "layers", "layout"]);
    }
}
