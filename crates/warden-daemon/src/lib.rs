//! # Warden Daemon
//!
//! Run a unit of work as a singleton background process.
//!
//! ## Features
//!
//! - PID file lock (one instance per PID file)
//! - Unix daemonization (fork, setsid, chdir, privilege drop)
//! - Leveled file log, truncated on the first write of a run
//! - Signal handling (SIGTERM/SIGINT/SIGTSTP/SIGILL release the PID file and exit)
//! - Execution loop with a fixed delay and an optional time budget
//!
//! ## Usage
//!
//! ```rust,ignore
//! use warden_daemon::{from_fn, Daemon, DaemonConfig};
//!
//! let config = DaemonConfig {
//!     delay: 5,
//!     ..Default::default()
//! };
//!
//! Daemon::new(from_fn(|ctx| {
//!     ctx.logger().info("tick");
//!     Ok(())
//! }))
//! .configure(config)
//! .run();
//! ```

pub mod environment;
pub mod error;

#[cfg(unix)]
pub mod daemon;
#[cfg(unix)]
pub mod launcher;
#[cfg(unix)]
pub mod logger;
#[cfg(unix)]
pub mod pid;
#[cfg(unix)]
pub mod runloop;
#[cfg(unix)]
pub mod signal;
#[cfg(unix)]
pub mod worker;

// Re-exports
pub use environment::check_system;
pub use error::{DaemonError, WorkError, FATAL_EXIT_CODE};
pub use warden_config::{DaemonConfig, Severity};

#[cfg(unix)]
pub use daemon::Daemon;
#[cfg(unix)]
pub use logger::Logger;
#[cfg(unix)]
pub use pid::PidFile;
#[cfg(unix)]
pub use runloop::{ExecutionLoop, LoopExit};
#[cfg(unix)]
pub use signal::{DaemonSignal, SignalRouter};
#[cfg(unix)]
pub use worker::{from_fn, WorkContext, Worker};
