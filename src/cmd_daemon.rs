//! Daemon subcommand handlers for Warden.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use warden_config::{ConfigLoader, ConfigValidator, DaemonConfig};
use warden_daemon::{Daemon, PidFile};

use crate::cli::{Cli, Commands, RunArgs};
use crate::heartbeat::HeartbeatWorker;

/// How long `stop` waits for the process to go away.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);
const STOP_POLL_ATTEMPTS: u32 = 30;

/// Handle a parsed command line.
pub(crate) fn handle_command(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref(), cli.pid_file)?;

    match cli.command {
        Commands::Run(args) => daemon_run(config, &args),
        Commands::Status => daemon_status(&config),
        Commands::Stop { force } => daemon_stop(&config, force),
    }
}

/// Load the configuration file, if any, and apply the `--pid-file` override.
fn load_config(path: Option<&Path>, pid_file: Option<PathBuf>) -> Result<DaemonConfig> {
    let mut config = match path {
        Some(path) => ConfigLoader::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => DaemonConfig::default(),
    };

    if let Some(pid_file) = pid_file {
        config.pid_file = pid_file;
    }
    Ok(config)
}

/// Validate the configuration and hand the process over to the supervisor.
fn daemon_run(mut config: DaemonConfig, args: &RunArgs) -> Result<()> {
    args.apply(&mut config);

    let validation = ConfigValidator::validate(&config);
    for warning in &validation.warnings {
        warn!("Config warning at {}: {}", warning.path, warning.message);
    }
    if !validation.is_valid() {
        let errors: Vec<String> = validation
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect();
        bail!("Invalid configuration: {}", errors.join("; "));
    }

    info!(
        "Starting heartbeat daemon (pid file: {}, log file: {})",
        config.pid_file.display(),
        config.log_file.display()
    );
    Daemon::new(HeartbeatWorker::new()).configure(config).run()
}

/// Print the recorded PID and whether it is alive.
fn daemon_status(config: &DaemonConfig) -> Result<()> {
    let pid_file = PidFile::new(&config.pid_file);
    let pid = pid_file.get_pid();

    println!("Warden Daemon Status");
    println!("====================");
    println!("PID File: {}", config.pid_file.display());

    if pid == 0 {
        println!("\nDaemon is NOT RUNNING");
    } else if PidFile::is_process_running(pid) {
        println!("\nDaemon is RUNNING (PID: {})", pid);
    } else {
        println!("\nDaemon is NOT RUNNING (stale PID {} in file)", pid);
    }

    Ok(())
}

/// Signal the recorded PID and wait for it to exit.
fn daemon_stop(config: &DaemonConfig, force: bool) -> Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let pid_file = PidFile::new(&config.pid_file);
    let pid = pid_file.get_pid();

    if pid == 0 {
        info!("Daemon is not running");
        return Ok(());
    }
    if !PidFile::is_process_running(pid) {
        warn!("Stale PID file {} (PID {} is gone), removing", config.pid_file.display(), pid);
        pid_file.unset_pid();
        return Ok(());
    }

    info!("Stopping daemon (PID: {})...", pid);
    let raw = i32::try_from(pid).context("PID out of range")?;
    let signal = if force { Signal::SIGKILL } else { Signal::SIGTERM };
    kill(Pid::from_raw(raw), signal).context("Failed to send signal")?;

    for _ in 0..STOP_POLL_ATTEMPTS {
        thread::sleep(STOP_POLL_INTERVAL);
        if !PidFile::is_process_running(pid) {
            info!("Daemon stopped");
            // SIGKILL leaves the file behind.
            if pid_file.exists() {
                pid_file.unset_pid();
            }
            return Ok(());
        }
    }

    if force {
        bail!("Daemon (PID {}) did not stop in time", pid);
    }
    warn!("Daemon did not stop gracefully, try --force");
    Ok(())
}
