//! Core strategy: one core per sink, merged by a tee, optionally sampled

use super::sampler::{Sampler, Sampling};
use super::Backend;
use crate::field::{Field, Scope};
use crate::format::{Encoding, Record};
use crate::level::Level;
use crate::sink::SharedSink;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Encoder + level filter + destination
pub trait Core: Send + Sync {
    /// Whether a record at `level` would reach any destination.
    fn enabled(&self, level: Level) -> bool;

    /// Encode and write a record. Failures stay inside the core.
    fn write(&self, record: &Record);
}

/// A core bound to a single sink
pub struct IoCore {
    encoding: Encoding,
    sink: SharedSink,
}

impl IoCore {
    pub fn new(sink: SharedSink) -> Self {
        Self { encoding: sink.encoding(), sink }
    }
}

impl Core for IoCore {
    fn enabled(&self, level: Level) -> bool {
        self.sink.level().accepts(level)
    }

    fn write(&self, record: &Record) {
        if !self.enabled(record.level) {
            return;
        }
        let line = self.encoding.encode(record);
        if let Err(err) = self.sink.write(line.as_bytes()) {
            log::warn!(
                target: "logbridge::sink",
                "failed to write to {} sink: {}",
                self.sink.output(),
                err
            );
        }
    }
}

/// Fan-out over several cores
#[derive(Default)]
pub struct Tee {
    cores: Vec<Box<dyn Core>>,
}

impl Tee {
    pub fn new(cores: Vec<Box<dyn Core>>) -> Self {
        Self { cores }
    }
}

impl Core for Tee {
    fn enabled(&self, level: Level) -> bool {
        self.cores.iter().any(|c| c.enabled(level))
    }

    fn write(&self, record: &Record) {
        for core in &self.cores {
            core.write(record);
        }
    }
}

/// State shared by a core logger and every logger derived from it
struct Shared {
    sinks: Vec<SharedSink>,
    sampling: Option<Sampling>,
    root: OnceLock<Box<dyn Core>>,
}

pub(crate) struct CoreBackend {
    shared: Arc<Shared>,
    scope: Scope,
}

impl CoreBackend {
    pub(crate) fn new(sinks: Vec<SharedSink>, sampling: Option<Sampling>) -> Self {
        Self {
            shared: Arc::new(Shared { sinks, sampling, root: OnceLock::new() }),
            scope: Scope::default(),
        }
    }
}

impl fmt::Debug for CoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreBackend")
            .field("sinks", &self.shared.sinks)
            .field("sampling", &self.shared.sampling)
            .field("initialized", &self.shared.root.get().is_some())
            .field("scope", &self.scope)
            .finish()
    }
}

impl Backend for CoreBackend {
    fn name(&self) -> &'static str {
        "core"
    }

    fn init(&self, timeout: Duration) {
        self.shared.root.get_or_init(|| {
            let mut cores: Vec<Box<dyn Core>> = Vec::with_capacity(self.shared.sinks.len());
            for sink in &self.shared.sinks {
                cores.push(Box::new(IoCore::new(Arc::clone(sink))));
                sink.wait(timeout);
            }
            let tee: Box<dyn Core> = Box::new(Tee::new(cores));
            match self.shared.sampling {
                Some(sampling) => Box::new(Sampler::new(tee, sampling)),
                None => tee,
            }
        });
    }

    fn flush(&self, timeout: Duration) {
        for sink in &self.shared.sinks {
            sink.flush(timeout);
        }
    }

    fn scope(&self) -> &Scope {
        &self.scope
    }

    fn derive(&self, scope: Scope) -> Arc<dyn Backend> {
        Arc::new(CoreBackend { shared: Arc::clone(&self.shared), scope })
    }

    fn log(&self, level: Level, message: &str, fields: &[Field]) {
        let Some(root) = self.shared.root.get() else { return };
        if !root.enabled(level) {
            return;
        }
        root.write(&Record::new(level, message, self.scope.render(fields)));
    }
}
