//! Route `log` crate records through the façade
//!
//! Libraries keep using `log::info!` and friends; once the bridge is
//! installed their records reach whatever logger is current in the given
//! registry, with the record target attached as a `target` field.

use crate::error::ConfigError;
use crate::field::Field;
use crate::level::Level;
use crate::registry::Registry;
use std::sync::Arc;

/// Target prefix of the crate's own diagnostics.
const INTERNAL_TARGET: &str = "logbridge";

struct Bridge {
    registry: Arc<Registry>,
    max_level: log::LevelFilter,
}

impl log::Log for Bridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // the façade's own warnings must not feed back into it
        if record.target().starts_with(INTERNAL_TARGET) {
            eprintln!("[{}] {}: {}", record.level(), record.target(), record.args());
            return;
        }
        if let Some(logger) = self.registry.current() {
            logger.log(
                Level::from(record.level()),
                &record.args().to_string(),
                &[Field::string("target", record.target())],
            );
        }
    }

    fn flush(&self) {}
}

/// Install the bridge as the process's `log` implementation.
///
/// Fails with [`ConfigError::BridgeInstalled`] when any `log` implementation
/// is already set.
pub fn install(registry: Arc<Registry>, max_level: log::LevelFilter) -> Result<(), ConfigError> {
    log::set_boxed_logger(Box::new(Bridge { registry, max_level }))?;
    log::set_max_level(max_level);
    Ok(())
}

/// [`install`] on the global registry.
pub fn install_global(max_level: log::LevelFilter) -> Result<(), ConfigError> {
    install(Registry::global(), max_level)
}
