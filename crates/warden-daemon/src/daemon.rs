//! The supervisor.
//!
//! [`Daemon`] composes the pieces in a fixed order: environment check,
//! singleton check, optional detach, runtime and signal setup, then the
//! execution loop. The tokio runtime is built only after the fork, so the
//! process is still single-threaded when it detaches.

use std::sync::Arc;

use tracing::{error, info};
use warden_config::DaemonConfig;

use crate::environment::check_system;
use crate::error::{DaemonError, FATAL_EXIT_CODE};
use crate::launcher::daemonize;
use crate::logger::Logger;
use crate::pid::PidFile;
use crate::runloop::{ExecutionLoop, LoopExit};
use crate::signal::{install_fault_handler, SignalAction, SignalRouter};
use crate::worker::Worker;

/// Runs a [`Worker`] as a singleton background process.
pub struct Daemon<W> {
    worker: W,
    config: DaemonConfig,
}

impl<W: Worker> Daemon<W> {
    /// Create a supervisor with the default configuration.
    pub fn new(worker: W) -> Self {
        Self {
            worker,
            config: DaemonConfig::default(),
        }
    }

    /// Replace the configuration. Options not set in `config` take their
    /// defaults; nothing is merged with the previous configuration.
    pub fn configure(mut self, config: DaemonConfig) -> Self {
        self.config = config;
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    /// Start the daemon and run until the loop stops.
    ///
    /// In daemon mode the calling process exits inside this function and
    /// only the detached child returns. A bound signal exits the process
    /// from the signal task after cleanup, so this returns only when the
    /// time budget is spent or the worker fails.
    pub fn start(self) -> Result<LoopExit, DaemonError> {
        let Daemon { mut worker, mut config } = self;

        check_system(&config)?;

        // Paths are fixed before the working directory changes.
        config.pid_file = std::path::absolute(&config.pid_file)?;
        config.log_file = std::path::absolute(&config.log_file)?;

        let pid_file = Arc::new(PidFile::new(&config.pid_file));
        let running = pid_file.get_pid();
        if running != 0 {
            error!(
                "Daemon already running (PID file: {}, PID: {})",
                config.pid_file.display(),
                running
            );
            return Err(DaemonError::AlreadyRunning {
                path: config.pid_file.clone(),
                pid: running,
            });
        }

        let logger = Arc::new(Logger::from_config(&config));

        let pid = if config.daemon {
            daemonize(&config, &pid_file, &logger)?
        } else {
            let pid = std::process::id();
            if !pid_file.set_pid(pid) {
                return Err(DaemonError::PidFileWrite {
                    path: config.pid_file.clone(),
                });
            }
            pid
        };

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| DaemonError::Runtime(e.to_string()))?;

        let exit = runtime.block_on(async {
            let router = SignalRouter::new();
            router.install(shutdown_action(pid_file.clone(), logger.clone()))?;
            install_fault_handler(pid_file.path())?;

            info!("Daemon started (PID: {})", pid);
            logger.info(format!("daemon started (pid {})", pid));

            let exit = ExecutionLoop::from_config(&config, logger.clone())
                .run(&mut worker)
                .await;
            Ok::<_, DaemonError>(exit)
        })?;

        info!("Daemon stopped after {} iterations", exit.iterations());
        logger.info("daemon stopped");
        pid_file.unset_pid();
        logger.close();

        Ok(exit)
    }

    /// Start the daemon and exit the process when it stops.
    ///
    /// Exits 0 on a normal stop and [`FATAL_EXIT_CODE`] on a startup error.
    pub fn run(self) -> ! {
        match self.start() {
            Ok(_) => std::process::exit(0),
            Err(e) => {
                error!("{}", e);
                eprintln!("{}", e);
                std::process::exit(FATAL_EXIT_CODE)
            }
        }
    }
}

/// Cleanup bound to every stop signal: release the PID file, close the log,
/// exit 0.
fn shutdown_action(pid_file: Arc<PidFile>, logger: Arc<Logger>) -> SignalAction {
    Arc::new(move |signal| {
        info!("Shutting down on {}", signal);
        logger.info(format!("received {}, shutting down", signal));
        pid_file.unset_pid();
        logger.close();
        std::process::exit(0);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::from_fn;
    use warden_config::Severity;

    #[test]
    fn test_new_uses_defaults() {
        let daemon = Daemon::new(from_fn(|_| Ok(())));
        assert_eq!(daemon.config(), &DaemonConfig::default());
    }

    #[test]
    fn test_configure_replaces_everything() {
        let first = DaemonConfig {
            delay: 3,
            log_level: Severity::Debug,
            ..Default::default()
        };
        let second = DaemonConfig {
            time_limit: 60,
            ..Default::default()
        };

        let daemon = Daemon::new(from_fn(|_| Ok(())))
            .configure(first)
            .configure(second.clone());

        assert_eq!(daemon.config(), &second);
        assert_eq!(daemon.config().delay, 10);
        assert_eq!(daemon.config().log_level, Severity::Info);
    }
}
