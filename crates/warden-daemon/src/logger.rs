//! Leveled file log owned by the daemon.
//!
//! The file is opened lazily on the first accepted record, truncated, and
//! exclusively locked for the rest of the process. Each record is one line:
//!
//! ```text
//! [2024-05-01 12:00:00]	[info]	 message
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use nix::fcntl::{Flock, FlockArg};
use parking_lot::Mutex;
use tracing::{debug, warn};
use warden_config::{DaemonConfig, Severity};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug)]
enum Sink {
    Unopened,
    Open(Flock<File>),
    /// Another process holds the file lock.
    Busy,
    Closed,
}

/// Daemon log file writer.
#[derive(Debug)]
pub struct Logger {
    path: PathBuf,
    threshold: Severity,
    sink: Mutex<Sink>,
}

impl Logger {
    /// Create a logger; nothing is opened until the first accepted record.
    pub fn new(path: impl Into<PathBuf>, threshold: Severity) -> Self {
        Self {
            path: path.into(),
            threshold,
            sink: Mutex::new(Sink::Unopened),
        }
    }

    /// Create a logger from the `log_file` and `log_level` options.
    pub fn from_config(config: &DaemonConfig) -> Self {
        Self::new(&config.log_file, config.log_level)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn threshold(&self) -> Severity {
        self.threshold
    }

    /// Whether the file handle is currently held.
    pub fn is_open(&self) -> bool {
        matches!(*self.sink.lock(), Sink::Open(_))
    }

    /// Append one record.
    ///
    /// Returns false when `level` does not pass the threshold, when the file
    /// cannot be opened or written, or after [`Logger::close`]. If another
    /// process holds the file lock, the file is left untouched and the
    /// logger stops trying for the rest of the run.
    pub fn log(&self, message: impl AsRef<str>, level: Severity) -> bool {
        if !self.threshold.admits(level) {
            return false;
        }

        let line = format_record(Local::now().naive_local(), level, message.as_ref());
        let mut sink = self.sink.lock();

        if matches!(*sink, Sink::Unopened) {
            match self.open() {
                Ok(file) => *sink = Sink::Open(file),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    warn!("Log file {} is locked by another process", self.path.display());
                    *sink = Sink::Busy;
                    return false;
                }
                Err(e) => {
                    warn!("Failed to open log file {}: {}", self.path.display(), e);
                    return false;
                }
            }
        }

        match &mut *sink {
            Sink::Open(file) => match file.write_all(line.as_bytes()) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to write log file {}: {}", self.path.display(), e);
                    false
                }
            },
            Sink::Unopened | Sink::Busy | Sink::Closed => false,
        }
    }

    pub fn debug(&self, message: impl AsRef<str>) -> bool {
        self.log(message, Severity::Debug)
    }

    pub fn info(&self, message: impl AsRef<str>) -> bool {
        self.log(message, Severity::Info)
    }

    pub fn warning(&self, message: impl AsRef<str>) -> bool {
        self.log(message, Severity::Warning)
    }

    pub fn error(&self, message: impl AsRef<str>) -> bool {
        self.log(message, Severity::Error)
    }

    pub fn critical(&self, message: impl AsRef<str>) -> bool {
        self.log(message, Severity::Critical)
    }

    /// Release the lock and close the file.
    ///
    /// Safe when the file was never opened. Once closed, the logger stays
    /// closed so the file is never truncated twice in one run.
    pub fn close(&self) {
        let mut sink = self.sink.lock();
        if let Sink::Open(file) = std::mem::replace(&mut *sink, Sink::Closed) {
            match file.unlock() {
                Ok(file) => drop(file),
                Err((_, errno)) => {
                    warn!("Failed to unlock log file {}: {}", self.path.display(), errno)
                }
            }
            debug!("Log file closed: {}", self.path.display());
        }
    }

    fn open(&self) -> io::Result<Flock<File>> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;

        let locked = Flock::lock(file, FlockArg::LockExclusiveNonblock)
            .map_err(|(_, errno)| io::Error::from(errno))?;
        // Truncate only once the lock is ours.
        locked.set_len(0)?;
        debug!("Log file opened: {}", self.path.display());
        Ok(locked)
    }
}

/// Render one log line, including the trailing newline.
pub fn format_record(at: NaiveDateTime, level: Severity, message: &str) -> String {
    format!(
        "[{}]\t[{}]\t {}\n",
        at.format(TIMESTAMP_FORMAT),
        level.name(),
        message
    )
}

#[cfg(test)]
#[path = "logger_tests.rs"]
mod tests;
