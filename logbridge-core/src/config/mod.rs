//! Logger configuration
//!
//! Values are resolved in the following order (highest priority wins):
//!
//! 1. **Environment variables** (`LOGBRIDGE_*`)
//! 2. **Config file** (`logbridge.toml`)
//! 3. **Defaults**
//!
//! ```ignore
//! use logbridge_core::config::LogSettings;
//!
//! let settings = LogSettings::load()?;
//! let logger = settings.builder()?.build();
//! logger.init(settings.init_timeout());
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! Code-only setups can use the option functions in [`options`] instead.

pub mod options;

pub use options::{
    with_file_age, with_file_max_backup, with_file_path, with_file_size, with_nr_app_name,
    with_nr_license, Config, ConfigOpt,
};

use crate::error::ConfigError;
use crate::level::Level;
use crate::logger::{LoggerBuilder, Sampling, Strategy};
use crate::sink::{
    ConsoleSink, FileConfig, FileDefaults, FileSink, Output, RemoteConfig, RemoteSink, SharedSink,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// File looked up by [`LogSettings::load`].
pub const DEFAULT_CONFIG_FILE: &str = "logbridge.toml";

/// Complete logging configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub log: LogSection,
}

/// The `[log]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Sinks to build, in order: `console`, `file`, `newrelic`
    pub output: Vec<String>,
    /// `core` or `handler`
    pub backend: String,
    pub init_timeout_ms: u64,
    pub flush_timeout_ms: u64,
    pub sampling: SamplingSettings,
    pub console: ConsoleSettings,
    pub file: FileSettings,
    pub newrelic: NewRelicSettings,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            output: vec!["console".to_string()],
            backend: "core".to_string(),
            init_timeout_ms: 5000,
            flush_timeout_ms: 5000,
            sampling: SamplingSettings::default(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
            newrelic: NewRelicSettings::default(),
        }
    }
}

/// `[log.sampling]`, honoured by the core backend only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingSettings {
    pub enabled: bool,
    pub tick_ms: u64,
    pub first: u64,
    pub thereafter: u64,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        let sampling = Sampling::default();
        Self {
            enabled: true,
            tick_ms: sampling.tick.as_millis() as u64,
            first: sampling.first,
            thereafter: sampling.thereafter,
        }
    }
}

impl SamplingSettings {
    pub fn to_sampling(&self) -> Option<Sampling> {
        self.enabled.then(|| Sampling {
            tick: Duration::from_millis(self.tick_ms),
            first: self.first,
            thereafter: self.thereafter,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    pub level: String,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self { level: "debug".to_string() }
    }
}

/// Which fallback values unset file options take
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileProfile {
    /// 150 MB rotation
    #[default]
    Standard,
    /// 25 MB rotation
    Compact,
}

impl FileProfile {
    pub fn defaults(self) -> FileDefaults {
        match self {
            FileProfile::Standard => FileDefaults::STANDARD,
            FileProfile::Compact => FileDefaults::COMPACT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    pub level: String,
    #[serde(flatten)]
    pub rotation: FileConfig,
    pub defaults: FileProfile,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            rotation: FileConfig::default(),
            defaults: FileProfile::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewRelicSettings {
    pub level: String,
    #[serde(flatten)]
    pub remote: RemoteConfig,
}

impl Default for NewRelicSettings {
    fn default() -> Self {
        Self { level: "info".to_string(), remote: RemoteConfig::default() }
    }
}

/// Map an `output` entry to its sink kind.
pub fn parse_output(name: &str) -> Result<Output, ConfigError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "console" => Ok(Output::Console),
        "file" => Ok(Output::File),
        "newrelic" | "remote" => Ok(Output::Remote),
        _ => Err(ConfigError::UnknownOutput(name.to_string())),
    }
}

impl LogSettings {
    /// Defaults, then `logbridge.toml` if present, then the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Same as [`LogSettings::load`] with an explicit file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut settings = Self::default();

        if path.exists() {
            let file_settings = Self::from_file(path)
                .with_context(|| format!("Failed to load log settings from {}", path.display()))?;
            settings.merge(file_settings);
        }

        settings.apply_env_vars();

        Ok(settings)
    }

    /// Parse a TOML file. A missing file is an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read log settings file: {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML log settings: {}", path.as_ref().display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML log settings")
    }

    /// Take `other` wholesale; unset tables were already defaulted by serde.
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply `LOGBRIDGE_*` overrides from an arbitrary lookup.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let log = &mut self.log;
        if let Some(output) = lookup("LOGBRIDGE_OUTPUT") {
            log.output = output
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(backend) = lookup("LOGBRIDGE_BACKEND") {
            log.backend = backend;
        }
        if let Some(level) = lookup("LOGBRIDGE_CONSOLE_LEVEL") {
            log.console.level = level;
        }
        if let Some(level) = lookup("LOGBRIDGE_FILE_LEVEL") {
            log.file.level = level;
        }
        if let Some(path) = lookup("LOGBRIDGE_FILE_PATH") {
            log.file.rotation.path = path;
        }
        if let Some(level) = lookup("LOGBRIDGE_NR_LEVEL") {
            log.newrelic.level = level;
        }
        if let Some(app) = lookup("LOGBRIDGE_NR_APP") {
            log.newrelic.remote.app = app;
        }
        if let Some(license) = lookup("LOGBRIDGE_NR_LICENSE") {
            log.newrelic.remote.license = license;
        }
    }

    /// Reject unknown outputs and backends. Levels are never rejected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.outputs()?;
        self.strategy()?;
        Ok(())
    }

    pub fn outputs(&self) -> Result<Vec<Output>, ConfigError> {
        self.log.output.iter().map(|name| parse_output(name)).collect()
    }

    pub fn strategy(&self) -> Result<Strategy, ConfigError> {
        match self.log.backend.trim().to_ascii_lowercase().as_str() {
            "core" => Ok(Strategy::Core { sampling: self.log.sampling.to_sampling() }),
            "handler" => Ok(Strategy::Handler),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }

    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.log.init_timeout_ms)
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.log.flush_timeout_ms)
    }

    /// Construct the configured sinks in `output` order.
    ///
    /// # Panics
    ///
    /// A `newrelic` output with a rejected credential panics, see
    /// [`RemoteSink::new`].
    pub fn build_sinks(&self) -> Result<Vec<SharedSink>, ConfigError> {
        let log = &self.log;
        let sinks = self
            .outputs()?
            .into_iter()
            .map(|output| -> SharedSink {
                match output {
                    Output::Console => {
                        Arc::new(ConsoleSink::new(Level::parse_or_debug(&log.console.level)))
                    }
                    Output::File => Arc::new(FileSink::with_defaults(
                        Level::parse_or_debug(&log.file.level),
                        &log.file.rotation,
                        log.file.defaults.defaults(),
                    )),
                    Output::Remote => Arc::new(RemoteSink::new(
                        Level::parse_or_debug(&log.newrelic.level),
                        &log.newrelic.remote,
                    )),
                }
            })
            .collect();
        Ok(sinks)
    }

    /// A builder preloaded with the configured sinks and strategy.
    pub fn builder(&self) -> Result<LoggerBuilder, ConfigError> {
        let strategy = self.strategy()?;
        Ok(LoggerBuilder::default().sinks(self.build_sinks()?).strategy(strategy))
    }

    /// Overlay programmatic options onto the file and remote tables.
    pub fn apply_options(&mut self, config: &Config) {
        let file = &mut self.log.file.rotation;
        if !config.file.path.is_empty() {
            file.path = config.file.path.clone();
        }
        if config.file.size > 0 {
            file.size = config.file.size;
        }
        if config.file.age > 0 {
            file.age = config.file.age;
        }
        if config.file.num > 0 {
            file.num = config.file.num;
        }
        let remote = &mut self.log.newrelic.remote;
        if !config.nr.app.is_empty() {
            remote.app = config.nr.app.clone();
        }
        if !config.nr.license.is_empty() {
            remote.license = config.nr.license.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_settings() {
        let settings = LogSettings::default();
        assert_eq!(settings.log.output, vec!["console"]);
        assert_eq!(settings.log.backend, "core");
        assert_eq!(settings.init_timeout(), Duration::from_secs(5));
        assert!(settings.validate().is_ok());
        assert_eq!(
            settings.strategy().unwrap(),
            Strategy::Core { sampling: Some(Sampling::default()) }
        );
    }

    #[test]
    fn test_parse_toml() {
        let settings = LogSettings::from_toml_str(
            r#"
            [log]
            output = ["console", "file"]
            backend = "handler"
            flush_timeout_ms = 250

            [log.console]
            level = "warning"

            [log.file]
            path = "/tmp/app.log"
            size = 10
            defaults = "compact"
            "#,
        )
        .unwrap();

        assert_eq!(settings.outputs().unwrap(), vec![Output::Console, Output::File]);
        assert_eq!(settings.strategy().unwrap(), Strategy::Handler);
        assert_eq!(settings.flush_timeout(), Duration::from_millis(250));
        assert_eq!(settings.log.init_timeout_ms, 5000);
        assert_eq!(settings.log.console.level, "warning");
        assert_eq!(settings.log.file.level, "info");
        assert_eq!(settings.log.file.rotation.path, "/tmp/app.log");
        assert_eq!(settings.log.file.rotation.size, 10);
        assert_eq!(settings.log.file.defaults, FileProfile::Compact);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut settings =
            LogSettings::from_toml_str("[log]\noutput = [\"file\"]\n[log.file]\nlevel = \"error\"\n")
                .unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            ("LOGBRIDGE_OUTPUT", "console, file"),
            ("LOGBRIDGE_FILE_LEVEL", "debug"),
            ("LOGBRIDGE_NR_APP", "svc"),
        ]);
        settings.apply_env_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.log.output, vec!["console", "file"]);
        assert_eq!(settings.log.file.level, "debug");
        assert_eq!(settings.log.newrelic.remote.app, "svc");
    }

    #[test]
    fn test_unknown_output_rejected() {
        let mut settings = LogSettings::default();
        settings.log.output.push("syslog".to_string());
        assert!(matches!(settings.validate(), Err(ConfigError::UnknownOutput(name)) if name == "syslog"));
        assert!(settings.build_sinks().is_err());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let mut settings = LogSettings::default();
        settings.log.backend = "fast".to_string();
        assert!(matches!(settings.validate(), Err(ConfigError::UnknownBackend(_))));
    }

    #[test]
    fn test_unknown_level_degrades_to_debug() {
        let mut settings = LogSettings::default();
        settings.log.console.level = "verbose".to_string();
        assert!(settings.validate().is_ok());

        let sinks = settings.build_sinks().unwrap();
        assert_eq!(sinks.len(), 1);
        assert_eq!(sinks[0].level(), Level::Debug);
    }

    #[test]
    fn test_file_sink_is_lazy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/app.log");
        let mut settings = LogSettings::default();
        settings.log.output = vec!["file".to_string()];
        settings.log.file.rotation.path = path.display().to_string();

        let sinks = settings.build_sinks().unwrap();
        assert_eq!(sinks[0].output(), Output::File);
        assert_eq!(sinks[0].level(), Level::Info);
        assert!(!path.exists());
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LogSettings::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings.log.backend, LogSettings::default().log.backend);
    }

    #[test]
    fn test_from_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[log\noutput = ").unwrap();

        let err = LogSettings::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("broken.toml"), "{err}");
        assert!(LogSettings::from_file(dir.path().join("absent.toml")).is_err());
    }
}
