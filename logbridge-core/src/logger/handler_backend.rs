//! Handler strategy: a fan-out over per-sink handlers

use super::Backend;
use crate::field::{Field, Scope};
use crate::format::{Encoding, Record};
use crate::level::Level;
use crate::sink::SharedSink;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Receives every record and decides on its own whether to emit it
pub trait Handler: Send + Sync {
    fn enabled(&self, level: Level) -> bool;

    fn handle(&self, record: &Record);
}

/// Handler writing to one sink with that sink's encoder
pub struct SinkHandler {
    level: Level,
    encoding: Encoding,
    sink: SharedSink,
}

impl SinkHandler {
    pub fn new(sink: SharedSink) -> Self {
        Self { level: sink.level(), encoding: sink.encoding(), sink }
    }
}

impl Handler for SinkHandler {
    fn enabled(&self, level: Level) -> bool {
        self.level.accepts(level)
    }

    fn handle(&self, record: &Record) {
        if !self.enabled(record.level) {
            return;
        }
        if let Err(err) = self.sink.write(self.encoding.encode(record).as_bytes()) {
            log::warn!(
                target: "logbridge::sink",
                "handler failed to write to {} sink: {}",
                self.sink.output(),
                err
            );
        }
    }
}

/// Dispatches each record to all handlers
#[derive(Default)]
pub struct FanOut {
    handlers: Vec<Box<dyn Handler>>,
}

impl FanOut {
    pub fn new(handlers: Vec<Box<dyn Handler>>) -> Self {
        Self { handlers }
    }
}

impl Handler for FanOut {
    fn enabled(&self, level: Level) -> bool {
        self.handlers.iter().any(|h| h.enabled(level))
    }

    fn handle(&self, record: &Record) {
        for handler in &self.handlers {
            handler.handle(record);
        }
    }
}

struct Shared {
    sinks: Vec<SharedSink>,
    root: OnceLock<FanOut>,
}

pub(crate) struct HandlerBackend {
    shared: Arc<Shared>,
    scope: Scope,
}

impl HandlerBackend {
    pub(crate) fn new(sinks: Vec<SharedSink>) -> Self {
        Self { shared: Arc::new(Shared { sinks, root: OnceLock::new() }), scope: Scope::default() }
    }
}

impl fmt::Debug for HandlerBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerBackend")
            .field("sinks", &self.shared.sinks)
            .field("initialized", &self.shared.root.get().is_some())
            .field("scope", &self.scope)
            .finish()
    }
}

impl Backend for HandlerBackend {
    fn name(&self) -> &'static str {
        "handler"
    }

    fn init(&self, timeout: Duration) {
        self.shared.root.get_or_init(|| {
            let handlers = self
                .shared
                .sinks
                .iter()
                .map(|sink| {
                    sink.wait(timeout);
                    Box::new(SinkHandler::new(Arc::clone(sink))) as Box<dyn Handler>
                })
                .collect();
            FanOut::new(handlers)
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
        Arc::new(HandlerBackend { shared: Arc::clone(&self.shared), scope })
    }

    fn log(&self, level: Level, message: &str, fields: &[Field]) {
        let Some(fan_out) = self.shared.root.get() else { return };
        if fan_out.enabled(level) {
            fan_out.handle(&Record::new(level, message, self.scope.render(fields)));
        }
    }
}
