//! Tokio runtime management for synchronous operations

use crate::{CloudError, Result};
use std::sync::{Arc, OnceLock};
use tokio::runtime::Runtime;

/// Get or create the shared Tokio runtime used to block on store calls
pub(crate) fn get_runtime() -> Result<Arc<Runtime>> {
    static RUNTIME: OnceLock<Arc<Runtime>> = OnceLock::new();

    if let Some(runtime) = RUNTIME.get() {
        return Ok(runtime.clone());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("ng-link-cloud-worker")
        .build()
        .map_err(|e| CloudError::Runtime(format!("Failed to create Tokio runtime: {}", e)))?;

    // Another thread may have won the race; use whichever runtime got stored
    Ok(RUNTIME.get_or_init(|| Arc::new(runtime)).clone())
}
