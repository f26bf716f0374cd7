//! # Warden Config
//!
//! Configuration for Warden daemons: the typed option table consumed by the
//! supervisor, a TOML loader with `${VAR}` and `~` expansion, and an advisory
//! validator used by the command line front end.

mod error;
mod level;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use level::Severity;
pub use loader::ConfigLoader;
pub use schema::{DaemonConfig, DEFAULT_DELAY_SECS, DEFAULT_LOG_FILE, DEFAULT_PID_FILE};
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
