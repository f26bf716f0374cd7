//! Configuration loader.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ConfigError;
use crate::schema::DaemonConfig;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<DaemonConfig, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConfigError::NotFound(path.display().to_string()),
            _ => ConfigError::Io(e),
        })?;
        Self::load_str(&content)
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<DaemonConfig, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let mut config: DaemonConfig = toml::from_str(&expanded)?;
        Self::expand_paths(&mut config);
        Ok(config)
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();

        for cap in ENV_VAR.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    fn expand_paths(config: &mut DaemonConfig) {
        config.pid_file = Self::expand_path_buf(&config.pid_file);
        config.log_file = Self::expand_path_buf(&config.log_file);
        if let Some(root) = config.root_dir.take() {
            config.root_dir = Some(Self::expand_path_buf(&root));
        }
    }

    fn expand_path_buf(path: &Path) -> PathBuf {
        match path.to_str() {
            Some(s) => PathBuf::from(Self::expand_path(s)),
            None => path.to_path_buf(),
        }
    }

    /// Expand shell-style paths (e.g., `~/run/warden.pid`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Severity;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config, DaemonConfig::default());
    }

    #[test]
    fn test_load_full_config() {
        let content = r#"
            daemon = false
            delay = 20
            root_dir = "/srv/warden"
            log_file = "/var/log/warden.log"
            log_level = "debug"
            uid = 1000
            gid = 1000
            time_limit = 3600
            pid_file = "/run/warden.pid"
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert!(!config.daemon);
        assert_eq!(config.delay, 20);
        assert_eq!(config.root_dir(), Some(Path::new("/srv/warden")));
        assert_eq!(config.log_level, Severity::Debug);
        assert_eq!(config.uid(), Some(1000));
        assert_eq!(config.euid(), None);
        assert_eq!(config.time_limit, 3600);
        assert_eq!(config.pid_file, PathBuf::from("/run/warden.pid"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "delay = 5").unwrap();
        writeln!(file, "log_level = 3").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.delay, 5);
        assert_eq!(config.log_level, Severity::Warning);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/warden.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("delay = [unclosed");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::set_var("WARDEN_TEST_RUN_DIR", "/tmp/warden-run");
        }
        let config = ConfigLoader::load_str("pid_file = \"${WARDEN_TEST_RUN_DIR}/w.pid\"").unwrap();
        assert_eq!(config.pid_file, PathBuf::from("/tmp/warden-run/w.pid"));
        unsafe {
            std::env::remove_var("WARDEN_TEST_RUN_DIR");
        }
    }

    #[test]
    fn test_missing_env_var() {
        let result = ConfigLoader::load_str("pid_file = \"${WARDEN_TEST_SURELY_UNSET}\"");
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(name)) if name == "WARDEN_TEST_SURELY_UNSET"));
    }

    #[test]
    fn test_expand_path() {
        let expanded = ConfigLoader::expand_path("~/.warden");
        assert!(!expanded.starts_with('~'));
    }

    #[test]
    fn test_tilde_in_pid_file() {
        let config = ConfigLoader::load_str("pid_file = \"~/warden.pid\"").unwrap();
        assert!(!config.pid_file.starts_with("~"));
        assert!(config.pid_file.ends_with("warden.pid"));
    }
}
