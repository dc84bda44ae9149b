//! Error types

/// Errors raised while constructing or driving a sink
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to init remote telemetry app: {0}")]
    InvalidCredential(String),
    #[error("remote telemetry request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("sink is closed")]
    Closed,
}

/// Errors raised while loading or applying configuration
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid log level: {0:?} (expected debug, info, warning or error)")]
    InvalidLevel(String),
    #[error("unknown log output: {0:?} (expected console, file or newrelic)")]
    UnknownOutput(String),
    #[error("unknown logger backend: {0:?} (expected core or handler)")]
    UnknownBackend(String),
    #[error("a `log` crate logger is already installed")]
    BridgeInstalled(#[from] log::SetLoggerError),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Result type for sink construction
pub type SinkResult<T> = Result<T, SinkError>;
