//! The viewer-state descriptor written by link generators
//!
//! The document is kept as an untyped JSON tree. Only the optional top-level
//! `ng_link` entry is ever inspected or rewritten.

use crate::{Error, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// File name every generator writes into the output directory
pub const DESCRIPTOR_FILE_NAME: &str = "process_output.json";

/// File the inline viewer URL is saved to, next to the descriptor
pub const ENCODED_URL_FILE_NAME: &str = "neuroglancer_encoded_url.txt";

/// Key under which generators record a link to the uploaded descriptor
pub const NG_LINK_KEY: &str = "ng_link";

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A loaded viewer-state document
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    value: Value,
}

impl Descriptor {
    /// Wrap an existing JSON value
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// Read and parse a descriptor file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let value = serde_json::from_str(&contents)?;
        Ok(Self { value })
    }

    /// Write the descriptor as indented JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(&self.value)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// The whole document
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consume into the underlying JSON value
    pub fn into_value(self) -> Value {
        self.value
    }

    /// The `ng_link` entry, if the document is an object that carries one
    pub fn ng_link(&self) -> Option<&str> {
        self.value.get(NG_LINK_KEY).and_then(Value::as_str)
    }

    /// Replace (or add) the `ng_link` entry
    pub fn set_ng_link(&mut self, link: impl Into<String>) -> Result<()> {
        let map = self.value.as_object_mut().ok_or_else(|| {
            Error::Generator("descriptor root is not a JSON object".to_string())
        })?;
        map.insert(NG_LINK_KEY.to_string(), Value::String(link.into()));
        Ok(())
    }

    /// The document minus its `ng_link` entry
    pub fn state_without_link(&self) -> Value {
        match &self.value {
            Value::Object(map) => Value::Object(
                map.iter()
                    .filter(|(k, _)| k.as_str() != NG_LINK_KEY)
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect::<Map<String, Value>>(),
            ),
            other => other.clone(),
        }
    }
}

/// Path of the descriptor inside an output directory
pub fn descriptor_path(output_dir: &Path) -> PathBuf {
    output_dir.join(DESCRIPTOR_FILE_NAME)
}

/// Wait until a generator's descriptor shows up in `output_dir`
///
/// Returns the descriptor path, or `Error::DescriptorMissing` once `timeout`
/// has elapsed without the file appearing.
pub fn wait_for_descriptor(output_dir: &Path, timeout: Duration) -> Result<PathBuf> {
    let path = descriptor_path(output_dir);
    let start = Instant::now();

    loop {
        if path.is_file() {
            debug!("Descriptor found at {:?} after {:?}", path, start.elapsed());
            return Ok(path);
        }
        if start.elapsed() >= timeout {
            return Err(Error::DescriptorMissing {
                path,
                waited: timeout,
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
}
