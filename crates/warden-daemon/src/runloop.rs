//! The execution loop.
//!
//! Invoke the worker, sleep `delay`, repeat, until the optional time budget
//! is spent. The budget is checked at the top of each iteration, so the loop
//! stops at most one delay after the budget runs out.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::Instant;
use tracing::{debug, error, info};
use warden_config::DaemonConfig;

use crate::error::WorkError;
use crate::logger::Logger;
use crate::worker::{WorkContext, Worker};

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The time budget was spent.
    TimeLimit { iterations: u64 },
    /// The worker failed; the failing iteration is included in the count.
    WorkFailed { iterations: u64 },
}

impl LoopExit {
    /// Number of times the worker was invoked.
    pub fn iterations(&self) -> u64 {
        match *self {
            LoopExit::TimeLimit { iterations } | LoopExit::WorkFailed { iterations } => iterations,
        }
    }
}

/// Repeatedly invokes a [`Worker`].
pub struct ExecutionLoop {
    delay: Duration,
    time_limit: Option<Duration>,
    logger: Arc<Logger>,
}

impl ExecutionLoop {
    /// Create a loop. A `time_limit` of `None` runs until a signal arrives
    /// or the worker fails.
    pub fn new(delay: Duration, time_limit: Option<Duration>, logger: Arc<Logger>) -> Self {
        Self {
            delay,
            time_limit,
            logger,
        }
    }

    /// Create a loop from the `delay` and `time_limit` options.
    pub fn from_config(config: &DaemonConfig, logger: Arc<Logger>) -> Self {
        Self::new(config.delay(), config.time_limit(), logger)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }

    /// Run until the time budget is spent or the worker fails.
    pub async fn run<W: Worker + ?Sized>(&self, worker: &mut W) -> LoopExit {
        let start = Instant::now();
        let mut iterations = 0u64;

        loop {
            if let Some(limit) = self.time_limit {
                if start.elapsed() >= limit {
                    info!("Time limit of {:?} reached after {} iterations", limit, iterations);
                    self.logger.info(format!(
                        "time limit reached after {} iterations",
                        iterations
                    ));
                    return LoopExit::TimeLimit { iterations };
                }
            }

            iterations += 1;
            debug!("Starting iteration {}", iterations);
            let ctx = WorkContext::new(self.logger.clone(), iterations);

            let outcome = AssertUnwindSafe(worker.do_work(&ctx)).catch_unwind().await;
            let failure = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e),
                Err(payload) => Some(WorkError::Panicked(panic_message(payload.as_ref()))),
            };

            if let Some(e) = failure {
                error!("Work unit failed on iteration {}: {}", iterations, e);
                self.logger.critical(format!(
                    "work unit failed on iteration {}: {}",
                    iterations, e
                ));
                return LoopExit::WorkFailed { iterations };
            }

            tokio::time::sleep(self.delay).await;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
#[path = "runloop_tests.rs"]
mod tests;
