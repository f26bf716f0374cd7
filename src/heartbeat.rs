//! The bundled work unit: one info record per iteration.

use async_trait::async_trait;
use tracing::debug;

use warden_daemon::{WorkContext, WorkError, Worker};

/// Writes a heartbeat line to the daemon log each time it runs.
#[derive(Debug, Default)]
pub(crate) struct HeartbeatWorker {
    ticks: u64,
}

impl HeartbeatWorker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Worker for HeartbeatWorker {
    async fn do_work(&mut self, ctx: &WorkContext) -> Result<(), WorkError> {
        self.ticks += 1;
        debug!("Heartbeat {}", self.ticks);
        ctx.logger()
            .info(format!("heartbeat {} (pid {})", self.ticks, std::process::id()));
        Ok(())
    }
}
