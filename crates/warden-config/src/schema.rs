//! Daemon option table.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::level::Severity;

/// Default pause between work invocations, in seconds.
pub const DEFAULT_DELAY_SECS: u64 = 10;
/// Default pid file name, relative to the launch directory.
pub const DEFAULT_PID_FILE: &str = "daemon.pid";
/// Default log file name, relative to the launch directory.
pub const DEFAULT_LOG_FILE: &str = "daemon.log";

/// Daemon options.
///
/// Built once before the daemon runs and read-only afterwards. Every key is
/// optional in TOML; absent keys take the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Detach from the terminal (fork + setsid) before running.
    #[serde(default = "default_daemon")]
    pub daemon: bool,

    /// Pause between work invocations (in seconds).
    #[serde(default = "default_delay")]
    pub delay: u64,

    /// Working directory to change into after detaching.
    #[serde(default)]
    pub root_dir: Option<PathBuf>,

    /// Leveled log file.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Log threshold; records less severe than this are dropped.
    #[serde(default)]
    pub log_level: Severity,

    /// Real user id applied while detaching.
    #[serde(default)]
    pub uid: Option<u32>,

    /// Real group id applied while detaching.
    #[serde(default)]
    pub gid: Option<u32>,

    /// Effective user id applied while detaching.
    #[serde(default)]
    pub euid: Option<u32>,

    /// Effective group id applied while detaching.
    #[serde(default)]
    pub egid: Option<u32>,

    /// Total run time before a graceful stop (in seconds). 0 runs forever.
    #[serde(default)]
    pub time_limit: u64,

    /// Pid lock file.
    #[serde(default = "default_pid_file")]
    pub pid_file: PathBuf,
}

fn default_daemon() -> bool {
    true
}

fn default_delay() -> u64 {
    DEFAULT_DELAY_SECS
}

fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

fn default_pid_file() -> PathBuf {
    PathBuf::from(DEFAULT_PID_FILE)
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            daemon: default_daemon(),
            delay: default_delay(),
            root_dir: None,
            log_file: default_log_file(),
            log_level: Severity::default(),
            uid: None,
            gid: None,
            euid: None,
            egid: None,
            time_limit: 0,
            pid_file: default_pid_file(),
        }
    }
}

impl DaemonConfig {
    /// Create a config with the given pid file and defaults elsewhere.
    pub fn with_pid_file(pid_file: impl Into<PathBuf>) -> Self {
        Self {
            pid_file: pid_file.into(),
            ..Default::default()
        }
    }

    /// Pause between work invocations.
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay)
    }

    /// Total run budget, `None` when unbounded.
    pub fn time_limit(&self) -> Option<Duration> {
        (self.time_limit > 0).then(|| Duration::from_secs(self.time_limit))
    }

    /// Working directory, ignoring an empty path.
    pub fn root_dir(&self) -> Option<&Path> {
        self.root_dir
            .as_deref()
            .filter(|dir| !dir.as_os_str().is_empty())
    }

    /// Requested real uid, if set and non-zero.
    pub fn uid(&self) -> Option<u32> {
        non_zero(self.uid)
    }

    /// Requested real gid, if set and non-zero.
    pub fn gid(&self) -> Option<u32> {
        non_zero(self.gid)
    }

    /// Requested effective uid, if set and non-zero.
    pub fn euid(&self) -> Option<u32> {
        non_zero(self.euid)
    }

    /// Requested effective gid, if set and non-zero.
    pub fn egid(&self) -> Option<u32> {
        non_zero(self.egid)
    }
}

fn non_zero(id: Option<u32>) -> Option<u32> {
    id.filter(|&id| id != 0)
}
