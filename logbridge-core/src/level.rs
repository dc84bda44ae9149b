//! Severity levels shared by sinks, records and the `log` bridge

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Log levels in order of severity
///
/// A sink with threshold `t` accepts a record at level `l` when `t <= l`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Detailed information for debugging
    #[default]
    Debug,
    /// Informational messages about normal operation
    Info,
    /// Warning conditions that should be investigated
    Warn,
    /// Errors that need attention
    Error,
}

impl Level {
    /// All levels, lowest first.
    pub const ALL: [Level; 4] = [Level::Debug, Level::Info, Level::Warn, Level::Error];

    /// Parse a configured level string, falling back to `Debug`.
    ///
    /// Accepted spellings are `debug`, `info`, `warning` and `error`.
    pub fn parse_or_debug(s: &str) -> Self {
        s.parse().unwrap_or(Level::Debug)
    }

    /// Upper-case name used by every encoder.
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }

    /// Whether a sink at this threshold accepts a record at `record`.
    #[inline]
    pub fn accepts(self, record: Level) -> bool {
        self <= record
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            _ => Err(ConfigError::InvalidLevel(s.to_string())),
        }
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warn,
            log::Level::Info => Level::Info,
            log::Level::Debug | log::Level::Trace => Level::Debug,
        }
    }
}

impl From<Level> for log::Level {
    fn from(level: Level) -> Self {
        match level {
            Level::Error => log::Level::Error,
            Level::Warn => log::Level::Warn,
            Level::Info => log::Level::Info,
            Level::Debug => log::Level::Debug,
        }
    }
}
