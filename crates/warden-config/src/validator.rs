//! Configuration validation.
//!
//! Validation is advisory: the supervisor runs any config it is given, the
//! command line front end validates before starting.

use crate::schema::DaemonConfig;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &DaemonConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_files(config, &mut result);
        Self::validate_timing(config, &mut result);
        Self::validate_identity(config, &mut result);

        result
    }

    fn validate_files(config: &DaemonConfig, result: &mut ValidationResult) {
        if config.pid_file.as_os_str().is_empty() {
            result.add_error(ValidationError::new("pid_file", "pid_file cannot be empty"));
        }

        if config.log_file.as_os_str().is_empty() {
            result.add_error(ValidationError::new("log_file", "log_file cannot be empty"));
        }

        if config.pid_file == config.log_file {
            result.add_error(ValidationError::new(
                "log_file",
                "log_file and pid_file must be different files",
            ));
        }

        if let Some(root) = config.root_dir() {
            if !root.is_dir() {
                result.add_warning(ValidationWarning::new(
                    "root_dir",
                    format!("root_dir does not exist: {}", root.display()),
                ));
            }
        }
    }

    fn validate_timing(config: &DaemonConfig, result: &mut ValidationResult) {
        if config.delay == 0 {
            result.add_warning(ValidationWarning::new(
                "delay",
                "delay is 0, the work unit will be invoked back to back",
            ));
        }

        if config.time_limit > 0 && config.delay >= config.time_limit {
            result.add_warning(ValidationWarning::new(
                "time_limit",
                format!(
                    "time_limit ({}s) is not larger than delay ({}s), the work unit runs once",
                    config.time_limit, config.delay
                ),
            ));
        }
    }

    fn validate_identity(config: &DaemonConfig, result: &mut ValidationResult) {
        let requested = config.uid().is_some()
            || config.gid().is_some()
            || config.euid().is_some()
            || config.egid().is_some();

        if requested && !config.daemon {
            result.add_warning(ValidationWarning::new(
                "uid",
                "uid/gid options only apply when daemon = true",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
