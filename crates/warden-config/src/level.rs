//! Log severity levels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Severity of a daemon log record.
///
/// Codes run from 1 (most severe) to 5 (least severe). A threshold admits a
/// record when the record's code is less than or equal to the threshold's
/// code, so `Severity::Debug` is the most permissive threshold.
///
/// `Ord` is intentionally not derived: the numeric order of the codes is the
/// reverse of the severity order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "SeverityRepr", into = "u8")]
pub enum Severity {
    Critical = 1,
    Error = 2,
    Warning = 3,
    #[default]
    Info = 4,
    Debug = 5,
}

impl Severity {
    /// All levels, most severe first.
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::Error,
        Severity::Warning,
        Severity::Info,
        Severity::Debug,
    ];

    /// Numeric code of this level.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Look up a level by numeric code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.code() == code)
    }

    /// Name written into the log file.
    pub fn name(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Debug => "debug",
        }
    }

    /// Whether a record at `record` passes this threshold.
    pub fn admits(self, record: Severity) -> bool {
        record.code() <= self.code()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Severity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if let Ok(code) = value.parse::<u8>() {
            return Self::from_code(code).ok_or_else(|| invalid(value));
        }

        match value.to_ascii_lowercase().as_str() {
            "critical" | "crit" => Ok(Severity::Critical),
            "error" | "err" => Ok(Severity::Error),
            "warning" | "warn" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            "debug" => Ok(Severity::Debug),
            _ => Err(invalid(value)),
        }
    }
}

fn invalid(value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: "log_level".to_string(),
        message: format!("unknown severity '{}', expected 1-5 or a level name", value),
    }
}

/// Accepted TOML spellings: an integer code or a level name.
#[derive(Deserialize)]
#[serde(untagged)]
enum SeverityRepr {
    Code(u8),
    Name(String),
}

impl TryFrom<SeverityRepr> for Severity {
    type Error = ConfigError;

    fn try_from(repr: SeverityRepr) -> Result<Self, ConfigError> {
        match repr {
            SeverityRepr::Code(code) => {
                Self::from_code(code).ok_or_else(|| invalid(&code.to_string()))
            }
            SeverityRepr::Name(name) => name.parse(),
        }
    }
}

impl From<Severity> for u8 {
    fn from(level: Severity) -> Self {
        level.code()
    }
}
