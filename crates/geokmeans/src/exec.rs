//! Explicit execution context. The estimator never consults process-global
//! thread or device state; whoever constructs it decides how much parallelism
//! the pairwise distance path may use.

use std::sync::Arc;

use snafu::ResultExt;

use crate::{ConfigError, ThreadPoolSnafu};

#[derive(Debug, Clone, Default)]
pub struct ExecContext {
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl ExecContext {
    /// Everything on the calling thread.
    pub fn sequential() -> Self {
        Self { pool: None }
    }

    /// Dedicated worker pool for the pairwise distance matrix.
    /// `num_threads == 0` lets rayon pick the core count.
    pub fn with_threads(num_threads: usize) -> Result<Self, ConfigError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .context(ThreadPoolSnafu)?;
        Ok(Self {
            pool: Some(Arc::new(pool)),
        })
    }

    pub(crate) fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    pub(crate) fn install<R: Send>(&self, f: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }
}
