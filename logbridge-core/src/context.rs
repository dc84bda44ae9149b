//! Request-scoped logger bindings

use crate::logger::Logger;
use std::sync::Arc;

#[derive(Debug)]
struct Binding {
    logger: Logger,
    parent: Option<Arc<Binding>>,
}

/// Immutable chain of logger bindings
///
/// Cloning shares the chain. A child made with [`Context::child`] shadows
/// its parent's binding and leaves the parent untouched.
#[derive(Clone, Debug, Default)]
pub struct Context {
    node: Option<Arc<Binding>>,
}

impl Context {
    /// Context without any binding.
    pub fn background() -> Self {
        Self::default()
    }

    /// Innermost bound logger, if any.
    pub fn logger(&self) -> Option<&Logger> {
        self.node.as_ref().map(|node| &node.logger)
    }

    pub fn child(&self, logger: Logger) -> Self {
        Self { node: Some(Arc::new(Binding { logger, parent: self.node.clone() })) }
    }

    /// Number of bindings in the chain.
    pub fn depth(&self) -> usize {
        std::iter::successors(self.node.as_deref(), |node| node.parent.as_deref()).count()
    }

    /// Whether both values share the same chain.
    pub fn ptr_eq(&self, other: &Context) -> bool {
        match (&self.node, &other.node) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}
