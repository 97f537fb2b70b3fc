//! Common assertions for ng-link testing

use anyhow::Result;
use ng_link_core::encode::{decode_fragment, FRAGMENT_MARKER};
use serde_json::Value;

/// Asserts that `url` points at `viewer_base` and carries exactly `expected`
pub fn assert_url_encodes(url: &str, viewer_base: &str, expected: &Value) -> Result<()> {
    assert!(
        url.starts_with(&format!("{}{}", viewer_base, FRAGMENT_MARKER)),
        "URL {} does not start with {}{}",
        url,
        viewer_base,
        FRAGMENT_MARKER
    );
    let decoded = decode_fragment(url)?;
    assert_eq!(&decoded, expected, "Decoded state mismatch for {}", url);
    Ok(())
}

/// Asserts that the fragment of `url` has no characters outside the unreserved set
pub fn assert_fully_escaped(url: &str) {
    let fragment = url
        .split_once(FRAGMENT_MARKER)
        .map(|(_, fragment)| fragment)
        .unwrap_or_default();
    let stray: Vec<char> = fragment
        .chars()
        .filter(|c| !(c.is_ascii_alphanumeric() || "-_.~%".contains(*c)))
        .collect();
    assert!(stray.is_empty(), "Unescaped characters {:?} in {}", stray, url);
}
