//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use logbridge_core::prelude::*;
//! ```

pub use crate::fields;

// === Façade ===
pub use crate::field::{Field, FieldValue};
pub use crate::level::Level;
pub use crate::logger::{Logger, LoggerBuilder, Sampling, Strategy};

// === Sinks ===
pub use crate::sink::{
    ConsoleSink, FileConfig, FileDefaults, FileSink, Output, RemoteConfig, RemoteSink, SharedSink,
    Sink,
};

// === Ambient access ===
pub use crate::context::Context;
pub use crate::registry::{current, from_ctx, with_ctx, Registry};

// === Configuration ===
pub use crate::config::LogSettings;

pub use std::time::Duration;
