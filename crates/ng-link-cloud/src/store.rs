//! Bucket-bound object store handle with a blocking call interface

use crate::runtime::get_runtime;
use crate::Result;
use object_store::aws::AmazonS3Builder;
use object_store::ObjectStore;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::debug;

/// Region used when neither the options nor the environment name one
pub const DEFAULT_REGION: &str = "us-west-2";

/// How to reach S3
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S3Options {
    /// AWS region; falls back to `AWS_REGION` / `AWS_DEFAULT_REGION`, then [`DEFAULT_REGION`]
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores
    pub endpoint: Option<String>,
    /// Send unsigned requests, for public buckets
    pub anonymous: bool,
}

/// An object store for one bucket plus the runtime that drives it
#[derive(Clone)]
pub struct CloudStore {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    runtime: Arc<Runtime>,
}

impl std::fmt::Debug for CloudStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudStore")
            .field("store", &self.store.to_string())
            .field("bucket", &self.bucket)
            .finish()
    }
}

impl CloudStore {
    /// Connect to `bucket` on S3 using the ambient credential chain
    pub fn s3(bucket: &str, options: &S3Options) -> Result<Self> {
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);

        match &options.region {
            Some(region) => builder = builder.with_region(region),
            None if region_from_env().is_none() => builder = builder.with_region(DEFAULT_REGION),
            None => {}
        }
        if let Some(endpoint) = &options.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }
        if options.anonymous {
            builder = builder.with_skip_signature(true);
        }

        let store = builder.build()?;
        debug!("Created S3 store for bucket {}", bucket);
        Self::from_store(Arc::new(store), bucket)
    }

    /// Wrap an existing store, e.g. `object_store::memory::InMemory` in tests
    pub fn from_store(store: Arc<dyn ObjectStore>, bucket: &str) -> Result<Self> {
        Ok(Self {
            store,
            bucket: bucket.to_string(),
            runtime: get_runtime()?,
        })
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Bucket this store is bound to
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Run a store future to completion on the shared runtime
    pub(crate) fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

fn region_from_env() -> Option<String> {
    std::env::var("AWS_REGION")
        .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
        .ok()
        .filter(|r| !r.is_empty())
}
