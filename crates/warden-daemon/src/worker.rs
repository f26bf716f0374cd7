//! The work unit contract.

use std::sync::Arc;

use async_trait::async_trait;
use warden_config::Severity;

use crate::error::WorkError;
use crate::logger::Logger;

/// A unit of work run by the daemon once per loop iteration.
///
/// Returning an error (or panicking) ends the run: the loop logs the failure
/// at critical severity and the daemon shuts down cleanly.
#[async_trait]
pub trait Worker: Send {
    async fn do_work(&mut self, ctx: &WorkContext) -> Result<(), WorkError>;
}

/// Per-iteration context handed to a [`Worker`].
#[derive(Debug, Clone)]
pub struct WorkContext {
    logger: Arc<Logger>,
    iteration: u64,
}

impl WorkContext {
    pub fn new(logger: Arc<Logger>, iteration: u64) -> Self {
        Self { logger, iteration }
    }

    /// The daemon's file logger.
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// 1-based index of the current iteration.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Shorthand for `ctx.logger().log(message, level)`.
    pub fn log(&self, message: impl AsRef<str>, level: Severity) -> bool {
        self.logger.log(message, level)
    }
}

/// Worker backed by a synchronous closure.
pub struct FnWorker<F> {
    f: F,
}

/// Wrap a closure as a [`Worker`].
pub fn from_fn<F>(f: F) -> FnWorker<F>
where
    F: FnMut(&WorkContext) -> Result<(), WorkError> + Send,
{
    FnWorker { f }
}

#[async_trait]
impl<F> Worker for FnWorker<F>
where
    F: FnMut(&WorkContext) -> Result<(), WorkError> + Send,
{
    async fn do_work(&mut self, ctx: &WorkContext) -> Result<(), WorkError> {
        (self.f)(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fn_worker_runs_closure() {
        let dir = TempDir::new().unwrap();
        let logger = Arc::new(Logger::new(dir.path().join("w.log"), Severity::Info));
        let mut calls = 0u32;

        {
            let mut worker = from_fn(|ctx| {
                calls += 1;
                assert_eq!(ctx.iteration(), 7);
                Ok(())
            });
            let ctx = WorkContext::new(logger, 7);
            worker.do_work(&ctx).await.unwrap();
        }

        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_context_logs_through_logger() {
        let dir = TempDir::new().unwrap();
        let logger = Arc::new(Logger::new(dir.path().join("w.log"), Severity::Info));
        let ctx = WorkContext::new(logger.clone(), 1);

        assert!(ctx.log("hello", Severity::Info));
        assert!(!ctx.log("hidden", Severity::Debug));
        assert!(logger.is_open());
    }
}
