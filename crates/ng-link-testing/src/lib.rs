//! Testing utilities and fixtures for ng-link
//!
//! This crate provides temporary directories, bucket mirrors laid out like
//! the real datasets, and helpers for checking generated viewer URLs.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub mod assertions;
pub mod fixtures;
pub mod helpers;

/// Creates a temporary test directory with cleanup on drop
pub struct TestDir {
    dir: TempDir,
}

impl TestDir {
    /// Creates a new temporary test directory
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    /// Returns the path to the temporary directory
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes a bucket-mirror object or descriptor at `name`, creating parent prefixes
    pub fn create_file(&self, name: &str, content: &[u8]) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Writes `value` as pretty JSON to `name`
    pub fn create_json(&self, name: &str, value: &serde_json::Value) -> Result<PathBuf> {
        self.create_file(name, serde_json::to_string_pretty(value)?.as_bytes())
    }

    /// Creates an empty dataset prefix or output directory at `name`
    pub fn create_dir(&self, name: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(&path)?;
        Ok(path)
    }
}
