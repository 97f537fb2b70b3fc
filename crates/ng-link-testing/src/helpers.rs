//! Helper utilities for ng-link testing

use anyhow::{Context, Result};
use ng_link_core::encode::decode_fragment;
use ng_link_core::DESCRIPTOR_FILE_NAME;
use serde_json::Value;
use std::path::Path;

/// The last non-empty line of a command's stdout
pub fn last_line(stdout: &[u8]) -> Result<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.trim().to_string())
        .context("stdout is empty")
}

/// Decodes the viewer state from the URL printed on the last line of stdout
pub fn decode_printed_url(stdout: &[u8]) -> Result<Value> {
    let url = last_line(stdout)?;
    Ok(decode_fragment(&url)?)
}

/// Reads the descriptor written into `output_dir`
pub fn read_descriptor(output_dir: &Path) -> Result<Value> {
    let path = output_dir.join(DESCRIPTOR_FILE_NAME);
    let contents =
        std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    Ok(serde_json::from_str(&contents)?)
}
