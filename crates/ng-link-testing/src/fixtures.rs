//! Bucket mirrors and descriptors for ng-link tests
//!
//! Mirrors are laid out the way `LocalMetadataSource` expects: object keys
//! relative to the test directory root, without the bucket name.

use crate::TestDir;
use anyhow::Result;
use ng_link_core::DESCRIPTOR_FILE_NAME;
use serde_json::{json, Value};
use std::path::PathBuf;

/// Level 0 shape used by [`create_exaspim_mirror`], in `t, c, z, y, x` order
pub const EXASPIM_SHAPE: [u64; 5] = [1, 1, 100, 200, 300];

/// Writes `process_output.json` with `value` under `dir`
pub fn create_descriptor(test_dir: &TestDir, dir: &str, value: &Value) -> Result<PathBuf> {
    let name = if dir.is_empty() {
        DESCRIPTOR_FILE_NAME.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), DESCRIPTOR_FILE_NAME)
    };
    test_dir.create_json(&name, value)
}

/// NGFF 0.4 attributes for a 5D volume with 0.748 µm lateral voxels
pub fn exaspim_attributes() -> Value {
    json!({
        "multiscales": [{
            "version": "0.4",
            "name": "SPIM",
            "axes": [
                {"name": "t", "type": "time", "unit": "millisecond"},
                {"name": "c", "type": "channel"},
                {"name": "z", "type": "space", "unit": "micrometer"},
                {"name": "y", "type": "space", "unit": "micrometer"},
                {"name": "x", "type": "space", "unit": "micrometer"}
            ],
            "datasets": [
                {"path": "0", "coordinateTransformations": [
                    {"type": "scale", "scale": [1.0, 1.0, 1.0, 0.748, 0.748]}
                ]},
                {"path": "1", "coordinateTransformations": [
                    {"type": "scale", "scale": [1.0, 1.0, 2.0, 1.496, 1.496]}
                ]}
            ]
        }]
    })
}

/// Mirrors one ExaSPIM OME-Zarr store at `key`
pub fn create_exaspim_mirror(test_dir: &TestDir, key: &str) -> Result<PathBuf> {
    let key = key.trim_end_matches('/');
    test_dir.create_json(&format!("{}/.zattrs", key), &exaspim_attributes())?;
    test_dir.create_json(
        &format!("{}/0/.zarray", key),
        &json!({
            "zarr_format": 2,
            "shape": EXASPIM_SHAPE,
            "chunks": [1, 1, 128, 128, 128],
            "dtype": "<u2"
        }),
    )?;
    Ok(test_dir.path().join(key))
}

/// Mirrors a fused HCR directory with one `channel_<wavelength>.zarr` per channel
pub fn create_hcr_mirror(test_dir: &TestDir, prefix: &str, channels: &[&str]) -> Result<PathBuf> {
    let prefix = prefix.trim_end_matches('/');
    for channel in channels {
        test_dir.create_json(
            &format!("{}/channel_{}.zarr/.zattrs", prefix, channel),
            &json!({
                "multiscales": [{
                    "axes": ["t", "c", "z", "y", "x"],
                    "datasets": [{"path": "0"}]
                }]
            }),
        )?;
    }
    Ok(test_dir.path().join(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ng_link_core::{LocalMetadataSource, MetadataSource};

    #[test]
    fn test_hcr_mirror_lists_channels() {
        let test_dir = TestDir::new().unwrap();
        create_hcr_mirror(&test_dir, "HCR_1/fused", &["561", "405"]).unwrap();

        let source = LocalMetadataSource::new(test_dir.path());
        assert_eq!(
            source.list_zarr_folders("HCR_1/fused").unwrap(),
            vec!["channel_405.zarr", "channel_561.zarr"]
        );
    }

    #[test]
    fn test_descriptor_location() {
        let test_dir = TestDir::new().unwrap();
        let path = create_descriptor(&test_dir, "results/", &json!({"layers": []})).unwrap();
        assert!(path.ends_with("results/process_output.json"));
        assert!(path.exists());
    }
}
