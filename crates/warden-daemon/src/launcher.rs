//! Detaching the current process from its terminal.

use std::os::unix::io::AsRawFd;

use nix::unistd::{chdir, dup2, fork, setegid, seteuid, setgid, setsid, setuid, ForkResult, Gid, Uid};
use tracing::{debug, info, warn};
use warden_config::DaemonConfig;

use crate::environment::DEV_NULL;
use crate::error::DaemonError;
use crate::logger::Logger;
use crate::pid::PidFile;

/// One identity change applied while detaching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdChange {
    Gid(u32),
    Egid(u32),
    Uid(u32),
    Euid(u32),
}

impl IdChange {
    fn apply(self) -> nix::Result<()> {
        match self {
            IdChange::Gid(id) => setgid(Gid::from_raw(id)),
            IdChange::Egid(id) => setegid(Gid::from_raw(id)),
            IdChange::Uid(id) => setuid(Uid::from_raw(id)),
            IdChange::Euid(id) => seteuid(Uid::from_raw(id)),
        }
    }
}

impl std::fmt::Display for IdChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdChange::Gid(id) => write!(f, "gid={}", id),
            IdChange::Egid(id) => write!(f, "egid={}", id),
            IdChange::Uid(id) => write!(f, "uid={}", id),
            IdChange::Euid(id) => write!(f, "euid={}", id),
        }
    }
}

/// Identity changes requested by `config`, in the order they are applied.
///
/// Groups go first: once the uid is lowered the process may no longer be
/// allowed to change its gid.
pub fn privilege_plan(config: &DaemonConfig) -> Vec<IdChange> {
    [
        config.gid().map(IdChange::Gid),
        config.egid().map(IdChange::Egid),
        config.uid().map(IdChange::Uid),
        config.euid().map(IdChange::Euid),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Apply the privilege plan. Failures are logged and skipped.
///
/// Returns the number of changes that took effect.
pub fn drop_privileges(config: &DaemonConfig, logger: &Logger) -> usize {
    let mut applied = 0;
    for change in privilege_plan(config) {
        match change.apply() {
            Ok(()) => {
                debug!("Applied {}", change);
                applied += 1;
            }
            Err(e) => {
                warn!("Failed to apply {}: {}", change, e);
                logger.warning(format!("failed to apply {}: {}", change, e));
            }
        }
    }
    applied
}

/// Point stdin, stdout and stderr at `/dev/null`.
fn redirect_stdio() {
    let dev_null = match std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(DEV_NULL)
    {
        Ok(file) => file,
        Err(e) => {
            warn!("Failed to open {}: {}", DEV_NULL, e);
            return;
        }
    };

    let fd = dev_null.as_raw_fd();
    for target in 0..=2 {
        if let Err(e) = dup2(fd, target) {
            warn!("Failed to redirect fd {}: {}", target, e);
        }
    }
}

/// Daemonize the process.
///
/// The parent exits with status 0 right after the fork; only the child
/// returns from this function. In the child: start a new session, change
/// into `root_dir`, drop privileges, detach stdio and record the child PID.
///
/// Nothing is rolled back when a later step fails.
pub fn daemonize(
    config: &DaemonConfig,
    pid_file: &PidFile,
    logger: &Logger,
) -> Result<u32, DaemonError> {
    info!("Daemonizing process...");

    // SAFETY: called before the async runtime exists, so the process is
    // still single-threaded.
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => {
            debug!("Forked child {}, parent exiting", child);
            std::process::exit(0);
        }
        Ok(ForkResult::Child) => {}
        Err(e) => return Err(DaemonError::ForkFailed(e.to_string())),
    }

    setsid().map_err(|e| DaemonError::SessionFailed(e.to_string()))?;

    if let Some(root) = config.root_dir() {
        if let Err(e) = chdir(root) {
            warn!("Failed to change directory to {}: {}", root.display(), e);
            logger.warning(format!(
                "failed to change directory to {}: {}",
                root.display(),
                e
            ));
        }
    }

    drop_privileges(config, logger);
    redirect_stdio();

    let pid = std::process::id();
    if !pid_file.set_pid(pid) {
        return Err(DaemonError::PidFileWrite {
            path: pid_file.path().to_path_buf(),
        });
    }

    info!("Process daemonized (PID: {})", pid);
    Ok(pid)
}
