//! PID file management for daemon processes.
//!
//! The file holds the raw decimal PID with no trailing newline. While this
//! process owns the record, the open handle carries an exclusive `flock`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use nix::fcntl::{Flock, FlockArg};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

/// PID file manager for preventing duplicate daemon instances.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    lock: Mutex<Option<Flock<File>>>,
}

impl PidFile {
    /// Create a new PID file manager.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(None),
        }
    }

    /// Get the PID file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if a PID file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Check if this process holds the lock.
    pub fn is_locked(&self) -> bool {
        self.lock.lock().is_some()
    }

    /// Read the recorded PID.
    ///
    /// Returns 0 when the file is absent, unreadable or does not start with
    /// a non-zero integer. Whether that process is alive is not checked.
    pub fn get_pid(&self) -> u32 {
        match fs::read_to_string(&self.path) {
            Ok(contents) => parse_pid(&contents),
            Err(e) if e.kind() == ErrorKind::NotFound => 0,
            Err(e) => {
                warn!("Failed to read PID file {}: {}", self.path.display(), e);
                0
            }
        }
    }

    /// Write `pid` to the file and keep it exclusively locked.
    ///
    /// A handle this process already holds is rewritten in place. Otherwise
    /// the file is opened, locked, and only then truncated, so a writer
    /// waiting on another owner's lock never clobbers its record.
    ///
    /// Returns whether the PID was written.
    pub fn set_pid(&self, pid: u32) -> bool {
        let mut held = self.lock.lock();
        let result = match held.take() {
            Some(locked) if self.exists() => rewrite(locked, pid),
            stale => {
                drop(stale);
                self.open_locked().and_then(|locked| rewrite(locked, pid))
            }
        };

        match result {
            Ok(locked) => {
                *held = Some(locked);
                info!("PID file created: {} (PID: {})", self.path.display(), pid);
                true
            }
            Err(e) => {
                warn!("Failed to write PID file {}: {}", self.path.display(), e);
                false
            }
        }
    }

    fn open_locked(&self) -> io::Result<Flock<File>> {
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

        Flock::lock(file, FlockArg::LockExclusive).map_err(|(_, errno)| io::Error::from(errno))
    }

    /// Release the lock, then delete the file.
    ///
    /// Returns false without touching the filesystem when there is no file.
    pub fn unset_pid(&self) -> bool {
        self.release();

        if !self.exists() {
            return false;
        }

        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("PID file removed: {}", self.path.display());
                true
            }
            Err(e) => {
                warn!("Failed to remove PID file {}: {}", self.path.display(), e);
                false
            }
        }
    }

    fn release(&self) {
        if let Some(locked) = self.lock.lock().take() {
            if let Err((_, errno)) = locked.unlock() {
                warn!("Failed to unlock PID file {}: {}", self.path.display(), errno);
            } else {
                debug!("PID file unlocked: {}", self.path.display());
            }
        }
    }

    /// Check if a process with the given PID is running.
    pub fn is_process_running(pid: u32) -> bool {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        let Ok(raw) = i32::try_from(pid) else {
            return false;
        };
        if raw <= 0 {
            return false;
        }

        // Signal 0 only probes; EPERM means the process exists under another user.
        match kill(Pid::from_raw(raw), None) {
            Ok(()) => true,
            Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if self.lock.get_mut().is_some() {
            self.unset_pid();
        }
    }
}

/// Replace the contents of a locked handle with `pid`.
fn rewrite(mut locked: Flock<File>, pid: u32) -> io::Result<Flock<File>> {
    locked.set_len(0)?;
    locked.seek(SeekFrom::Start(0))?;
    locked.write_all(pid.to_string().as_bytes())?;
    locked.flush()?;
    Ok(locked)
}

/// Parse the leading integer of `contents`, 0 when there is none.
///
/// Any non-zero integer counts as a recorded PID: negative or out-of-range
/// values saturate to `u32::MAX`.
fn parse_pid(contents: &str) -> u32 {
    let trimmed = contents.trim_start();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    let digits = rest[..end].trim_start_matches('0');

    if digits.is_empty() {
        0
    } else if negative {
        u32::MAX
    } else {
        digits.parse().unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
#[path = "pid_tests.rs"]
mod tests;
