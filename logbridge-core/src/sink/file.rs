//! Rotated local file sink

use super::rotation::{RotatingWriter, RotationPolicy};
use super::{Output, Sink};
use crate::level::Level;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// File settings as configured; zero or empty values fall back to
/// [`FileDefaults`]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Target file, e.g. `./logs/app.log`
    pub path: String,
    /// Maximum size in megabytes before rotation
    pub size: u64,
    /// Maximum number of days to retain rotated files
    pub age: u32,
    /// Maximum number of rotated files to retain
    pub num: u32,
}

/// Fallback values for unset [`FileConfig`] entries
///
/// Two profiles exist and are kept apart on purpose: the façade default
/// rotates at 150 MB, the compact profile at 25 MB.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileDefaults {
    pub path: &'static str,
    pub max_size_mb: u64,
    pub max_age_days: u32,
    pub max_backups: u32,
}

impl FileDefaults {
    pub const STANDARD: FileDefaults =
        FileDefaults { path: "./logs/app.log", max_size_mb: 150, max_age_days: 28, max_backups: 7 };

    pub const COMPACT: FileDefaults =
        FileDefaults { path: "./logs/app.log", max_size_mb: 25, max_age_days: 28, max_backups: 7 };
}

impl Default for FileDefaults {
    fn default() -> Self {
        FileDefaults::STANDARD
    }
}

impl FileConfig {
    /// Fill unset values from `defaults`.
    pub fn resolve(&self, defaults: FileDefaults) -> RotationPolicy {
        let path = if self.path.trim().is_empty() { defaults.path } else { self.path.as_str() };
        let size = if self.size == 0 { defaults.max_size_mb } else { self.size };
        let age = if self.age == 0 { defaults.max_age_days } else { self.age };
        let num = if self.num == 0 { defaults.max_backups } else { self.num };
        RotationPolicy::new(path, size, age, num)
    }
}

/// Writes one JSON record per line to a rotated file
#[derive(Debug)]
pub struct FileSink {
    level: Level,
    writer: RotatingWriter,
}

impl FileSink {
    /// File sink using [`FileDefaults::STANDARD`] for unset values.
    pub fn new(level: Level, config: &FileConfig) -> Self {
        Self::with_defaults(level, config, FileDefaults::STANDARD)
    }

    pub fn with_defaults(level: Level, config: &FileConfig, defaults: FileDefaults) -> Self {
        Self { level, writer: RotatingWriter::new(config.resolve(defaults)) }
    }

    pub fn policy(&self) -> &RotationPolicy {
        self.writer.policy()
    }

    pub fn is_open(&self) -> bool {
        self.writer.is_open()
    }
}

impl Sink for FileSink {
    fn output(&self) -> Output {
        Output::File
    }

    fn level(&self) -> Level {
        self.level
    }

    fn write(&self, line: &[u8]) -> anyhow::Result<()> {
        self.writer.write(line)
    }

    /// Closes the file handle.
    fn flush(&self, _timeout: Duration) {
        if let Err(err) = self.writer.close() {
            log::warn!(
                target: "logbridge::sink",
                "failed to close log file {}: {}",
                self.writer.policy().path.display(),
                err
            );
        }
    }
}
