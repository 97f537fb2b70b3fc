//! Viewer URL encoding
//!
//! Neuroglancer accepts its whole state inline after `#!` in the URL. The
//! state is serialized without whitespace and every byte outside the
//! unreserved set is percent-encoded, so JSON punctuation never leaks into
//! the fragment unescaped. URL length is not checked.

use crate::descriptor::Descriptor;
use crate::{Error, Result};
use serde_json::Value;
use std::path::Path;

/// Default Neuroglancer deployment
pub const DEFAULT_VIEWER_BASE: &str = "https://neuroglancer-demo.appspot.com/";

/// Marker separating the viewer base from the inline state
pub const FRAGMENT_MARKER: &str = "#!";

/// Serialize a state without inter-token whitespace
pub fn compact_json(state: &Value) -> Result<String> {
    Ok(serde_json::to_string(state)?)
}

/// Compact and percent-encode a state for use in a URL fragment
pub fn encode_state(state: &Value) -> Result<String> {
    let compact = compact_json(state)?;
    Ok(urlencoding::encode(&compact).into_owned())
}

/// Build `<viewer_base>#!<encoded state>`
pub fn viewer_url(viewer_base: &str, state: &Value) -> Result<String> {
    Ok(format!("{}{}{}", viewer_base, FRAGMENT_MARKER, encode_state(state)?))
}

/// Read a descriptor file and return its inline viewer URL
///
/// With `state_only` the descriptor's own `ng_link` entry is left out of the
/// encoded state.
pub fn encode_descriptor_file(path: &Path, viewer_base: &str, state_only: bool) -> Result<String> {
    let descriptor = Descriptor::load(path)?;
    if state_only {
        viewer_url(viewer_base, &descriptor.state_without_link())
    } else {
        viewer_url(viewer_base, descriptor.value())
    }
}

/// Recover the state embedded in a viewer URL
pub fn decode_fragment(url: &str) -> Result<Value> {
    let (_, encoded) = url
        .split_once(FRAGMENT_MARKER)
        .ok_or_else(|| Error::InvalidUri(format!("no '{}' fragment in {}", FRAGMENT_MARKER, url)))?;
    let decoded = urlencoding::decode(encoded)
        .map_err(|e| Error::InvalidUri(format!("fragment is not valid UTF-8: {}", e)))?;
    Ok(serde_json::from_str(&decoded)?)
}
