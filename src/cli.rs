//! CLI definitions for Warden.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use warden_config::{DaemonConfig, Severity};

/// Warden CLI.
#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Run a unit of work as a singleton background daemon")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "WARDEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// PID file path (overrides the configuration file)
    #[arg(long, global = true)]
    pub pid_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Start the heartbeat daemon
    Run(RunArgs),

    /// Show whether the daemon is running
    Status,

    /// Stop the running daemon
    Stop {
        /// Send SIGKILL instead of SIGTERM
        #[arg(long)]
        force: bool,
    },
}

/// Options for `warden run`; each one overrides the configuration file.
#[derive(Args, Default)]
pub(crate) struct RunArgs {
    /// Stay attached to the terminal
    #[arg(long)]
    pub foreground: bool,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Seconds to sleep between iterations
    #[arg(long)]
    pub delay: Option<u64>,

    /// Total run time in seconds (0 runs until stopped)
    #[arg(long)]
    pub time_limit: Option<u64>,

    /// Log threshold: a name (debug..critical) or a code (1..5)
    #[arg(long)]
    pub log_level: Option<Severity>,
}

impl RunArgs {
    /// Apply the command line overrides on top of `config`.
    pub fn apply(&self, config: &mut DaemonConfig) {
        if self.foreground {
            config.daemon = false;
        }
        if let Some(log_file) = &self.log_file {
            config.log_file = log_file.clone();
        }
        if let Some(delay) = self.delay {
            config.delay = delay;
        }
        if let Some(time_limit) = self.time_limit {
            config.time_limit = time_limit;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_overrides() {
        let cli = Cli::try_parse_from([
            "warden",
            "run",
            "--foreground",
            "--delay",
            "2",
            "--time-limit",
            "30",
            "--log-level",
            "warning",
            "--pid-file",
            "/tmp/w.pid",
        ])
        .unwrap();

        assert_eq!(cli.pid_file, Some(PathBuf::from("/tmp/w.pid")));
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };

        let mut config = DaemonConfig::default();
        args.apply(&mut config);
        assert!(!config.daemon);
        assert_eq!(config.delay, 2);
        assert_eq!(config.time_limit, 30);
        assert_eq!(config.log_level, Severity::Warning);
    }

    #[test]
    fn test_numeric_log_level() {
        let cli = Cli::try_parse_from(["warden", "run", "--log-level", "5"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.log_level, Some(Severity::Debug));
    }

    #[test]
    fn test_empty_overrides_keep_config() {
        let mut config = DaemonConfig {
            delay: 4,
            ..Default::default()
        };
        RunArgs::default().apply(&mut config);
        assert_eq!(config.delay, 4);
        assert!(config.daemon);
    }

    #[test]
    fn test_parse_stop_force() {
        let cli = Cli::try_parse_from(["warden", "stop", "--force"]).unwrap();
        assert!(matches!(cli.command, Commands::Stop { force: true }));
    }

    #[test]
    fn test_rejects_bad_level() {
        assert!(Cli::try_parse_from(["warden", "run", "--log-level", "loud"]).is_err());
    }
}
