//! Logbridge - Core
//!
//! One structured logging façade in front of any mix of console, rotating
//! file and remote telemetry sinks.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use logbridge_core::prelude::*;
//!
//! let logger = Logger::builder()
//!     .sink(ConsoleSink::new(Level::Debug))
//!     .sink(FileSink::new(Level::Info, &FileConfig::default()))
//!     .build();
//! logger.init(Duration::from_secs(5));
//!
//! logger.inf("started", &fields!["service" => "billing"]);
//! logger.flush(Duration::from_secs(5));
//! ```
//!
//! # Architecture
//!
//! - [`sink`] - Output destinations with their own level and lifecycle
//! - [`logger`] - The [`Logger`] façade and its two backend strategies
//! - [`format`] - Text and JSON record encoders
//! - [`registry`] - Current-logger holder and context propagation
//! - [`config`] - TOML + environment settings
//! - [`bridge`] - Routes `log` crate records into the façade
//!
//! The crate's own diagnostics go through the `log` crate under targets
//! starting with `logbridge::`.

#[macro_use]
mod macros;

pub mod bridge;
pub mod config;
pub mod context;
pub mod error;
pub mod field;
pub mod format;
pub mod level;
pub mod logger;
pub mod prelude;
pub mod registry;
pub mod sink;

pub use context::Context;
pub use error::{ConfigError, SinkError};
pub use field::{Field, FieldValue, Scope};
pub use level::Level;
pub use logger::{new_core_logger, new_handler_logger, Logger, LoggerBuilder, Strategy};
pub use registry::{current, from_ctx, with_ctx, Registry};
