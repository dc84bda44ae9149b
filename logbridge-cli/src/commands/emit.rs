use anyhow::{bail, Result};
use logbridge_core::config::LogSettings;
use logbridge_core::{bridge, ConfigError, Field, FieldValue, Level};

/// Parse `key=value`, typing the value as int, float or bool when it reads as one.
fn parse_field(pair: &str) -> Result<Field> {
    let Some((key, raw)) = pair.split_once('=') else {
        bail!("invalid field \"{}\", expected key=value", pair);
    };
    if key.is_empty() {
        bail!("invalid field \"{}\", key cannot be empty", pair);
    }
    let value = if let Ok(n) = raw.parse::<i64>() {
        FieldValue::Int(n)
    } else if let Ok(f) = raw.parse::<f64>() {
        FieldValue::Float(f)
    } else if let Ok(b) = raw.parse::<bool>() {
        FieldValue::Bool(b)
    } else {
        FieldValue::Str(raw.to_string())
    };
    Ok(Field::from((key, value)))
}

/// Route `log` records from dependencies into the current logger.
fn forward_library_logs() -> Result<()> {
    match bridge::install_global(log::LevelFilter::Info) {
        // an earlier run in this process already installed it
        Ok(()) | Err(ConfigError::BridgeInstalled(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Build the configured logger, emit one record and shut down.
pub fn run(settings: &LogSettings, level: &str, message: &str, pairs: &[String]) -> Result<()> {
    let fields = pairs.iter().map(|p| parse_field(p)).collect::<Result<Vec<_>>>()?;
    let level = Level::parse_or_debug(level);

    let logger = settings.builder()?.build();
    forward_library_logs()?;
    logger.init(settings.init_timeout());
    logger.log(level, message, &fields);
    logger.flush(settings.flush_timeout());

    Ok(())
}
