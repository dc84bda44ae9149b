//! Current-logger holder
//!
//! The registry remembers the most recently built or derived logger so code
//! without an explicit handle can still log. Building a logger installs it;
//! `with`/`group` promote their result. Both are last-writer-wins.

use crate::context::Context;
use crate::logger::Logger;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};

static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();

#[derive(Debug, Default)]
pub struct Registry {
    current: RwLock<Option<Logger>>,
    promote: Mutex<()>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> Arc<Registry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Registry::new())))
    }

    pub fn current(&self) -> Option<Logger> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replace the current logger unconditionally.
    pub fn install(&self, logger: Logger) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(logger);
    }

    pub fn clear(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Install a logger derived through `with`/`group`.
    pub(crate) fn promote(&self, logger: &Logger) {
        let _guard = self.promote.lock().unwrap_or_else(PoisonError::into_inner);
        self.install(logger.clone());
    }

    fn is_current(&self, logger: &Logger) -> bool {
        self.current().is_some_and(|current| current.ptr_eq(logger))
    }

    /// Bind `logger` to a child of `ctx`.
    ///
    /// `None` returns `ctx` itself, as does binding the current logger to a
    /// context whose binding already is the current logger.
    pub fn with_ctx(&self, ctx: &Context, logger: Option<&Logger>) -> Context {
        let Some(logger) = logger else {
            return ctx.clone();
        };
        let already_bound = ctx.logger().is_some_and(|bound| self.is_current(bound));
        if already_bound && self.is_current(logger) {
            return ctx.clone();
        }
        ctx.child(logger.clone())
    }

    /// Logger for `ctx`; the current logger takes priority over the binding.
    ///
    /// Never fails: falls back to [`Logger::nop`].
    pub fn from_ctx(&self, ctx: &Context) -> Logger {
        if let Some(current) = self.current() {
            return current;
        }
        ctx.logger().cloned().unwrap_or_else(Logger::nop)
    }
}

/// [`Registry::with_ctx`] on the global registry.
pub fn with_ctx(ctx: &Context, logger: Option<&Logger>) -> Context {
    Registry::global().with_ctx(ctx, logger)
}

/// [`Registry::from_ctx`] on the global registry.
pub fn from_ctx(ctx: &Context) -> Logger {
    Registry::global().from_ctx(ctx)
}

/// Current logger of the global registry, or a nop logger.
pub fn current() -> Logger {
    Registry::global().current().unwrap_or_else(Logger::nop)
}
