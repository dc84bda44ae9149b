//! The logger façade
//!
//! A [`Logger`] is a cheap handle over a backend strategy. Every backend
//! shares its sinks and pipeline with the loggers derived from it through
//! [`Logger::with`] and [`Logger::group`]; only the accumulated [`Scope`]
//! differs between them.
//!
//! ```ignore
//! use logbridge_core::prelude::*;
//!
//! let logger = Logger::builder()
//!     .sink(ConsoleSink::new(Level::Debug))
//!     .build();
//! logger.init(Duration::from_secs(5));
//!
//! let req = logger.with(fields!["service" => "api"]);
//! req.inf("started", &[]);
//! logger.flush(Duration::from_secs(5));
//! ```

pub mod core_backend;
pub mod handler_backend;
pub mod sampler;

pub use core_backend::{Core, IoCore, Tee};
pub use handler_backend::{FanOut, Handler, SinkHandler};
pub use sampler::{Sampler, Sampling};

use crate::field::{Field, Scope};
use crate::level::Level;
use crate::registry::Registry;
use crate::sink::{SharedSink, Sink};
use core_backend::CoreBackend;
use handler_backend::HandlerBackend;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Strategy-specific half of a logger
pub(crate) trait Backend: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn init(&self, timeout: Duration);

    fn flush(&self, timeout: Duration);

    fn scope(&self) -> &Scope;

    /// New backend sharing this one's pipeline, carrying `scope`.
    fn derive(&self, scope: Scope) -> Arc<dyn Backend>;

    fn log(&self, level: Level, message: &str, fields: &[Field]);

    fn is_nop(&self) -> bool {
        false
    }
}

#[derive(Debug, Default)]
struct NopBackend {
    scope: Scope,
}

impl Backend for NopBackend {
    fn name(&self) -> &'static str {
        "nop"
    }

    fn init(&self, _timeout: Duration) {}

    fn flush(&self, _timeout: Duration) {}

    fn scope(&self) -> &Scope {
        &self.scope
    }

    fn derive(&self, _scope: Scope) -> Arc<dyn Backend> {
        Arc::new(NopBackend::default())
    }

    fn log(&self, _level: Level, _message: &str, _fields: &[Field]) {}

    fn is_nop(&self) -> bool {
        true
    }
}

/// How a logger turns records into sink writes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// One core per sink merged in a tee, optionally sampled
    Core { sampling: Option<Sampling> },
    /// One handler per sink behind a fan-out
    Handler,
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Core { sampling: None }
    }
}

/// Structured logger handle
///
/// Cloning is cheap and yields an identical logger (see [`Logger::ptr_eq`]).
#[derive(Clone)]
pub struct Logger {
    backend: Arc<dyn Backend>,
    registry: Weak<Registry>,
}

impl Logger {
    /// A logger that accepts every call and does nothing.
    pub fn nop() -> Self {
        Self { backend: Arc::new(NopBackend::default()), registry: Weak::new() }
    }

    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::default()
    }

    /// Build the per-sink pipeline and wait for each sink in turn.
    ///
    /// Only the first call has an effect. Records emitted before it are
    /// discarded.
    pub fn init(&self, timeout: Duration) {
        self.backend.init(timeout);
    }

    /// Flush every sink in the order they were supplied.
    pub fn flush(&self, timeout: Duration) {
        self.backend.flush(timeout);
    }

    /// Derive a logger carrying `fields` on every record.
    ///
    /// The result becomes the current logger of the registry this logger
    /// was built with.
    pub fn with(&self, fields: impl IntoIterator<Item = Field>) -> Logger {
        let mut fields = fields.into_iter().peekable();
        if fields.peek().is_none() {
            return self.clone();
        }
        let scope = self.backend.scope().with(fields);
        self.derive(scope)
    }

    /// Derive a logger whose later fields nest under `key`.
    ///
    /// An empty `key` behaves like [`Logger::with`], so `group("", [])`
    /// returns this logger unchanged.
    pub fn group(&self, key: &str, fields: impl IntoIterator<Item = Field>) -> Logger {
        let mut fields = fields.into_iter().peekable();
        if key.is_empty() && fields.peek().is_none() {
            return self.clone();
        }
        let scope = self.backend.scope().group(key, fields);
        self.derive(scope)
    }

    fn derive(&self, scope: Scope) -> Logger {
        let derived = Logger { backend: self.backend.derive(scope), registry: self.registry.clone() };
        if let Some(registry) = self.registry.upgrade() {
            registry.promote(&derived);
        }
        derived
    }

    pub fn log(&self, level: Level, message: &str, fields: &[Field]) {
        self.backend.log(level, message, fields);
    }

    pub fn dbg(&self, message: &str, fields: &[Field]) {
        self.log(Level::Debug, message, fields);
    }

    pub fn inf(&self, message: &str, fields: &[Field]) {
        self.log(Level::Info, message, fields);
    }

    pub fn wrn(&self, message: &str, fields: &[Field]) {
        self.log(Level::Warn, message, fields);
    }

    pub fn err(&self, message: &str, fields: &[Field]) {
        self.log(Level::Error, message, fields);
    }

    /// Whether both handles point at the same logger instance.
    pub fn ptr_eq(&self, other: &Logger) -> bool {
        Arc::ptr_eq(&self.backend, &other.backend)
    }

    pub fn is_nop(&self) -> bool {
        self.backend.is_nop()
    }

    /// `core`, `handler` or `nop`.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}

impl PartialEq for Logger {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Logger {}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").field("backend", &self.backend).finish()
    }
}

/// Collects sinks and options, then builds and installs a [`Logger`]
#[derive(Debug, Default)]
pub struct LoggerBuilder {
    sinks: Vec<SharedSink>,
    strategy: Strategy,
    registry: Option<Arc<Registry>>,
}

impl LoggerBuilder {
    pub fn sink(mut self, sink: impl Sink + 'static) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    pub fn shared_sink(mut self, sink: SharedSink) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn sinks(mut self, sinks: impl IntoIterator<Item = SharedSink>) -> Self {
        self.sinks.extend(sinks);
        self
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Install into `registry` instead of the process-wide one.
    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the logger and make it the registry's current logger.
    pub fn build(self) -> Logger {
        let backend: Arc<dyn Backend> = match self.strategy {
            Strategy::Core { sampling } => Arc::new(CoreBackend::new(self.sinks, sampling)),
            Strategy::Handler => Arc::new(HandlerBackend::new(self.sinks)),
        };
        let registry = self.registry.unwrap_or_else(Registry::global);
        let logger = Logger { backend, registry: Arc::downgrade(&registry) };
        registry.install(logger.clone());
        logger
    }
}

/// Core-strategy logger over `sinks`, installed as the global current logger.
pub fn new_core_logger(sinks: impl IntoIterator<Item = SharedSink>) -> Logger {
    Logger::builder().sinks(sinks).build()
}

/// Handler-strategy logger over `sinks`, installed as the global current logger.
pub fn new_handler_logger(sinks: impl IntoIterator<Item = SharedSink>) -> Logger {
    Logger::builder().sinks(sinks).strategy(Strategy::Handler).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{ConsoleSink, SharedBuffer};

    fn console_logger(level: Level) -> (Logger, SharedBuffer, Arc<Registry>) {
        let buf = SharedBuffer::new();
        let registry = Arc::new(Registry::new());
        let logger = Logger::builder()
            .sink(ConsoleSink::with_writer(level, buf.clone()))
            .registry(Arc::clone(&registry))
            .build();
        logger.init(Duration::ZERO);
        (logger, buf, registry)
    }

    #[test]
    fn test_with_nothing_returns_same_logger() {
        let (logger, _, _) = console_logger(Level::Debug);
        let same = logger.with(Vec::new());
        assert!(same.ptr_eq(&logger));
    }

    #[test]
    fn test_with_promotes_to_current() {
        let (logger, _, registry) = console_logger(Level::Debug);
        assert_eq!(registry.current(), Some(logger.clone()));

        let child = logger.with([Field::string("k", "v")]);
        assert!(!child.ptr_eq(&logger));
        assert_eq!(registry.current(), Some(child));
    }

    #[test]
    fn test_empty_group_returns_same_logger() {
        let (logger, _, registry) = console_logger(Level::Debug);
        let same = logger.group("", Vec::new());
        assert!(same.ptr_eq(&logger));
        assert_eq!(registry.current(), Some(logger.clone()));

        let named = logger.group("req", Vec::new());
        assert!(!named.ptr_eq(&logger));
    }

    #[test]
    fn test_concurrent_with_keeps_scopes_apart() {
        let (logger, buf, registry) = console_logger(Level::Debug);

        let derived: Vec<Logger> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let logger = &logger;
                    s.spawn(move || {
                        let child = logger.with([Field::int("worker", i)]);
                        child.inf("tick", &[]);
                        child
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let current = registry.current().unwrap();
        assert!(derived.iter().any(|child| child.ptr_eq(&current)));
        assert!(!current.ptr_eq(&logger));

        let lines = buf.lines();
        assert_eq!(lines.len(), 8);
        for line in &lines {
            assert_eq!(line.matches("worker=").count(), 1, "{line}");
        }
        for i in 0..8 {
            let tag = format!("tick worker={i}");
            assert_eq!(lines.iter().filter(|l| l.ends_with(&tag)).count(), 1, "{tag}");
        }
    }

    #[test]
    fn test_level_methods() {
        let (logger, buf, _) = console_logger(Level::Warn);
        logger.dbg("d", &[]);
        logger.inf("i", &[]);
        logger.wrn("w", &[]);
        logger.err("e", &[]);

        let lines = buf.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("WARN"));
        assert!(lines[1].contains("ERROR"));
    }

    #[test]
    fn test_nop_is_inert() {
        let nop = Logger::nop();
        nop.init(Duration::ZERO);
        nop.err("nothing", &[Field::int("n", 1)]);
        nop.flush(Duration::ZERO);

        let derived = nop.with([Field::bool("b", true)]).group("g", []);
        assert!(derived.is_nop());
        assert_eq!(derived.backend_name(), "nop");
    }

    #[test]
    fn test_strategy_names() {
        let registry = Arc::new(Registry::new());
        let core = Logger::builder().registry(Arc::clone(&registry)).build();
        let handler =
            Logger::builder().strategy(Strategy::Handler).registry(Arc::clone(&registry)).build();

        assert_eq!(core.backend_name(), "core");
        assert_eq!(handler.backend_name(), "handler");
        assert_eq!(registry.current(), Some(handler));
    }
}
