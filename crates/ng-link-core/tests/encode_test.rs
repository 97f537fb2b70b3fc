//! Integration tests for descriptor encoding

use ng_link_core::encode::decode_fragment;
use ng_link_core::{encode_descriptor_file, Error, DEFAULT_VIEWER_BASE, DESCRIPTOR_FILE_NAME};
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

fn write_descriptor(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(DESCRIPTOR_FILE_NAME);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_empty_layers_descriptor() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_descriptor(&temp_dir, "{\"layers\": []}");

    let url = encode_descriptor_file(&path, DEFAULT_VIEWER_BASE, false).unwrap();
    assert_eq!(
        url,
        "https://neuroglancer-demo.appspot.com/#!%7B%22layers%22%3A%5B%5D%7D"
    );
}

#[test]
fn test_pretty_descriptor_round_trips() {
    let temp_dir = TempDir::new().unwrap();
    let state = json!({
        "ng_link": "https://neuroglancer-demo.appspot.com/#!s3://aind-open-data/exa/process_output.json",
        "dimensions": {"x": [7.48e-7, "m"], "y": [7.48e-7, "m"], "z": [1e-6, "m"], "t": [0.001, "s"]},
        "layers": [{
            "type": "image",
            "source": "zarr://s3://aind-open-data/exa/SPIM.ome.zarr",
            "shaderControls": {"normalized": {"range": [0.0, 200.0]}},
            "opacity": 0.5,
            "blend": "default"
        }]
    });
    let path = write_descriptor(&temp_dir, &serde_json::to_string_pretty(&state).unwrap());

    let url = encode_descriptor_file(&path, DEFAULT_VIEWER_BASE, false).unwrap();
    assert!(url.starts_with("https://neuroglancer-demo.appspot.com/#!%7B"));
    assert_eq!(decode_fragment(&url).unwrap(), state);
}

#[test]
fn test_state_only_drops_ng_link() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_descriptor(&temp_dir, r#"{"ng_link": "https://x/#!s3://b/p.json", "layers": []}"#);

    let url = encode_descriptor_file(&path, DEFAULT_VIEWER_BASE, true).unwrap();
    assert_eq!(decode_fragment(&url).unwrap(), json!({"layers": []}));
}

#[test]
fn test_encoding_twice_is_identical() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_descriptor(&temp_dir, r#"{"b": {"y": 2, "x": 1}, "a": [true, null, "s p"]}"#);

    let first = encode_descriptor_file(&path, DEFAULT_VIEWER_BASE, false).unwrap();
    let second = encode_descriptor_file(&path, DEFAULT_VIEWER_BASE, false).unwrap();
    assert_eq!(first, second);

    // Document key order survives compaction
    let decoded: Value = decode_fragment(&first).unwrap();
    let keys: Vec<&String> = decoded.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["b", "a"]);
}

#[test]
fn test_missing_descriptor_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let err = encode_descriptor_file(
        &temp_dir.path().join(DESCRIPTOR_FILE_NAME),
        DEFAULT_VIEWER_BASE,
        false,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
}

#[test]
fn test_malformed_descriptor_is_parse_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_descriptor(&temp_dir, "{\"layers\": [}");
    let err = encode_descriptor_file(&path, DEFAULT_VIEWER_BASE, false).unwrap_err();
    assert!(matches!(err, Error::Json(_)));
}

#[test]
fn test_custom_viewer_base() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_descriptor(&temp_dir, "[]");
    let url = encode_descriptor_file(&path, "http://localhost:8080/", false).unwrap();
    assert_eq!(url, "http://localhost:8080/#!%5B%5D");
}
