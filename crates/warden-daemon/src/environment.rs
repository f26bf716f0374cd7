//! Platform checks run before anything else touches the system.

use std::path::Path;

use warden_config::DaemonConfig;

use crate::error::DaemonError;

/// Target for the detached process's standard streams.
pub const DEV_NULL: &str = "/dev/null";

/// Verify the host can run the daemon as configured.
///
/// Non-Unix platforms are rejected outright. Detaching additionally needs
/// [`DEV_NULL`] to exist.
pub fn check_system(config: &DaemonConfig) -> Result<(), DaemonError> {
    if cfg!(windows) {
        return Err(DaemonError::Environment(
            "Windows is not supported.".to_string(),
        ));
    }
    if !cfg!(unix) {
        return Err(DaemonError::Environment(format!(
            "Unsupported platform: {}",
            std::env::consts::OS
        )));
    }
    if config.daemon && !Path::new(DEV_NULL).exists() {
        return Err(DaemonError::Environment(format!(
            "{} is required to run as a daemon",
            DEV_NULL
        )));
    }
    Ok(())
}
