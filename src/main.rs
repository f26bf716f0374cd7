//! Warden - run a unit of work as a singleton background daemon.
//!
//! Main entry point for the Warden CLI.

mod cli;
#[cfg(unix)]
mod cmd_daemon;
#[cfg(unix)]
mod heartbeat;

use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use warden_daemon::FATAL_EXIT_CODE;

use crate::cli::Cli;

/// Initialize console tracing on stderr.
///
/// No writer threads are spawned, so the process can still fork afterwards.
fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .try_init()?;

    Ok(())
}

// Not async: the runtime must not exist before the supervisor forks.
fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("Failed to initialize tracing: {}", e);
    }

    let cli = Cli::parse();

    #[cfg(unix)]
    let result = cmd_daemon::handle_command(cli);

    #[cfg(not(unix))]
    let result = {
        let _ = cli;
        warden_daemon::check_system(&warden_config::DaemonConfig::default())
            .map_err(anyhow::Error::from)
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(FATAL_EXIT_CODE);
    }
}
