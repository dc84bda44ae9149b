//! Log sinks - where encoded records are sent
//!
//! A sink owns one destination, a fixed level threshold and the lifecycle
//! hooks the logger drives: [`Sink::wait`] once during `init`, and
//! [`Sink::flush`] once during `flush`.

pub mod buffer;
pub mod console;
pub mod file;
pub mod remote;
pub mod rotation;

pub use buffer::SharedBuffer;
pub use console::ConsoleSink;
pub use file::{FileConfig, FileDefaults, FileSink};
pub use remote::{HttpTelemetryClient, LogData, RemoteConfig, RemoteSink, TelemetryClient};
pub use rotation::{RotatingWriter, RotationPolicy};

use crate::format::Encoding;
use crate::level::Level;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Where a sink sends its records; selects the encoder
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Output {
    /// Terminal output, human-readable text
    Console,
    /// Local rotated file, one JSON object per line
    File,
    /// Remote telemetry backend, one JSON object per record
    Remote,
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Console => f.write_str("console"),
            Output::File => f.write_str("file"),
            Output::Remote => f.write_str("remote"),
        }
    }
}

/// One log destination
pub trait Sink: Send + Sync + fmt::Debug {
    /// Output kind, fixed at construction.
    fn output(&self) -> Output;

    /// Level threshold, fixed at construction.
    fn level(&self) -> Level;

    /// Encoder applied to records before [`Sink::write`].
    fn encoding(&self) -> Encoding {
        Encoding::for_output(self.output())
    }

    /// Write one encoded record. The sink adds its own framing.
    fn write(&self, line: &[u8]) -> anyhow::Result<()>;

    /// Block until the sink can accept records, at most `timeout`.
    fn wait(&self, _timeout: Duration) {}

    /// Release resources at shutdown, blocking at most `timeout`.
    fn flush(&self, _timeout: Duration) {}
}

/// Sinks are shared between a logger and everything derived from it.
pub type SharedSink = Arc<dyn Sink>;
