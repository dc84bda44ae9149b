//! Record encoders
//!
//! Console sinks get a human-readable text line, file and remote sinks get
//! one JSON object per record. Both encoders render fields in the order they
//! were attached; when a key repeats inside the same object, the last value
//! wins and keeps the position of the first occurrence.

use crate::field::{Field, FieldValue};
use crate::level::Level;
use crate::sink::Output;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};
use std::fmt::Write as _;

/// JSON key holding the level.
pub const LEVEL_KEY: &str = "level";
/// JSON key holding the RFC 3339 timestamp.
pub const TIME_KEY: &str = "time";
/// JSON key holding the message.
pub const MESSAGE_KEY: &str = "msg";

/// Top-level keys owned by the record itself.
const RESERVED_KEYS: [&str; 3] = [LEVEL_KEY, TIME_KEY, MESSAGE_KEY];

/// Prefix given to user fields that would shadow a reserved key.
const COLLISION_PREFIX: &str = "fields.";

/// A fully rendered log record, ready to encode
#[derive(Debug, Clone)]
pub struct Record {
    pub time: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    /// Scope fields followed by call-site fields
    pub fields: Vec<Field>,
}

impl Record {
    pub fn new(level: Level, message: impl Into<String>, fields: Vec<Field>) -> Self {
        Self { time: Utc::now(), level, message: message.into(), fields }
    }
}

/// How a record is turned into bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    /// `2024-01-15T10:30:00.000Z INFO  User logged in user_id=123`
    Text,
    /// Same as [`Encoding::Text`] with the level wrapped in ANSI colour codes
    ColorText,
    /// `{"level":"INFO","time":"2024-01-15T10:30:00Z","msg":"User logged in","user_id":123}`
    Json,
}

impl Encoding {
    /// Encoder used for a given output kind.
    pub fn for_output(output: Output) -> Self {
        match output {
            Output::Console => Encoding::Text,
            Output::File | Output::Remote => Encoding::Json,
        }
    }

    /// Encode one record, without a trailing newline.
    pub fn encode(self, record: &Record) -> String {
        match self {
            Encoding::Text => encode_text(record, false),
            Encoding::ColorText => encode_text(record, true),
            Encoding::Json => encode_json(record),
        }
    }
}

fn encode_json(record: &Record) -> String {
    let mut json = Map::new();
    json.insert(LEVEL_KEY.to_string(), Value::String(record.level.as_str().to_string()));
    json.insert(
        TIME_KEY.to_string(),
        Value::String(record.time.to_rfc3339_opts(SecondsFormat::Secs, true)),
    );
    json.insert(MESSAGE_KEY.to_string(), Value::String(record.message.clone()));
    for field in &record.fields {
        let key = if RESERVED_KEYS.contains(&field.key()) {
            format!("{COLLISION_PREFIX}{}", field.key())
        } else {
            field.key().to_string()
        };
        json.insert(key, json_value(field.value()));
    }

    serde_json::to_string(&json).unwrap_or_else(|_| "Failed to serialize log entry".to_string())
}

fn insert_fields(json: &mut Map<String, Value>, fields: &[Field]) {
    for field in fields {
        json.insert(field.key().to_string(), json_value(field.value()));
    }
}

fn json_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Str(s) => Value::String(s.clone()),
        FieldValue::Int(n) => Value::Number(Number::from(*n)),
        FieldValue::Float(f) => {
            Number::from_f64(*f).map(Value::Number).unwrap_or_else(|| Value::String(f.to_string()))
        }
        FieldValue::Bool(b) => Value::Bool(*b),
        FieldValue::Any(v) => v.clone(),
        FieldValue::Error(e) => Value::String(e.render()),
        FieldValue::Group(fields) => {
            let mut nested = Map::new();
            insert_fields(&mut nested, fields);
            Value::Object(nested)
        }
    }
}

fn encode_text(record: &Record, color: bool) -> String {
    let timestamp = record.time.format("%Y-%m-%dT%H:%M:%S%.3fZ");
    let level = record.level.as_str();
    let mut line = if color {
        format!("{} {}{:5}{} {}", timestamp, level_color(record.level), level, ANSI_RESET, record.message)
    } else {
        format!("{} {:5} {}", timestamp, level, record.message)
    };

    let mut pairs = Vec::new();
    flatten(&record.fields, "", &mut pairs);
    for (key, value) in dedup_last_wins(pairs) {
        let _ = write!(line, " {}={}", key, value);
    }
    line
}

const ANSI_RESET: &str = "\x1b[0m";

fn level_color(level: Level) -> &'static str {
    match level {
        Level::Debug => "\x1b[34m",
        Level::Info => "\x1b[32m",
        Level::Warn => "\x1b[33m",
        Level::Error => "\x1b[31m",
    }
}

/// Flatten nested groups into dotted keys.
fn flatten(fields: &[Field], prefix: &str, out: &mut Vec<(String, String)>) {
    for field in fields {
        let key =
            if prefix.is_empty() { field.key().to_string() } else { format!("{prefix}.{}", field.key()) };
        match field.value() {
            FieldValue::Group(nested) => flatten(nested, &key, out),
            FieldValue::Str(s) => out.push((key, quote_if_needed(s))),
            FieldValue::Int(n) => out.push((key, n.to_string())),
            FieldValue::Float(f) => out.push((key, f.to_string())),
            FieldValue::Bool(b) => out.push((key, b.to_string())),
            FieldValue::Any(Value::String(s)) => out.push((key, quote_if_needed(s))),
            FieldValue::Any(v) => out.push((key, quote_if_needed(&v.to_string()))),
            FieldValue::Error(e) => out.push((key, quote_if_needed(&e.render()))),
        }
    }
}

fn dedup_last_wins(pairs: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::with_capacity(pairs.len());
    for (key, value) in pairs {
        match out.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => out.push((key, value)),
        }
    }
    out
}

fn quote_if_needed(s: &str) -> String {
    if s.is_empty() || s.chars().any(|c| c.is_whitespace() || c == '"' || c == '=') {
        format!("{:?}", s)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: Vec<Field>) -> Record {
        Record::new(Level::Info, "started", fields)
    }

    #[test]
    fn test_json_format() {
        let formatted = Encoding::Json.encode(&record(vec![Field::string("service", "x")]));

        let parsed: Value = serde_json::from_str(&formatted).unwrap();
        assert_eq!(parsed["msg"], "started");
        assert_eq!(parsed["level"], "INFO");
        assert_eq!(parsed["service"], "x");
        assert!(parsed["time"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_json_keeps_attach_order() {
        let formatted = Encoding::Json.encode(&record(vec![
            Field::int("zeta", 1),
            Field::int("alpha", 2),
        ]));
        let zeta = formatted.find("zeta").unwrap();
        let alpha = formatted.find("alpha").unwrap();
        assert!(zeta < alpha, "{formatted}");
    }

    #[test]
    fn test_json_last_write_wins() {
        let formatted = Encoding::Json.encode(&record(vec![
            Field::string("user", "scope"),
            Field::string("user", "call"),
        ]));
        let parsed: Value = serde_json::from_str(&formatted).unwrap();
        assert_eq!(parsed["user"], "call");
        assert_eq!(formatted.matches("\"user\"").count(), 1);
    }

    #[test]
    fn test_json_groups_nest() {
        let formatted = Encoding::Json.encode(&record(vec![Field::group(
            "req",
            [Field::int("id", 1), Field::int("status", 200)],
        )]));
        let parsed: Value = serde_json::from_str(&formatted).unwrap();
        assert_eq!(parsed["req"], serde_json::json!({"id": 1, "status": 200}));
    }

    #[test]
    fn test_json_reserved_keys_not_overwritten() {
        let formatted = Encoding::Json.encode(&Record::new(
            Level::Error,
            "payment failed",
            vec![
                Field::string("msg", "user note"),
                Field::string("level", "low"),
                Field::string("time", "yesterday"),
            ],
        ));
        let parsed: Value = serde_json::from_str(&formatted).unwrap();
        assert_eq!(parsed["msg"], "payment failed");
        assert_eq!(parsed["level"], "ERROR");
        assert_ne!(parsed["time"], "yesterday");
        assert_eq!(parsed["fields.msg"], "user note");
        assert_eq!(parsed["fields.level"], "low");
        assert_eq!(parsed["fields.time"], "yesterday");
    }

    #[test]
    fn test_json_reserved_keys_free_inside_groups() {
        let formatted = Encoding::Json.encode(&record(vec![Field::group(
            "http",
            [Field::string("msg", "ok")],
        )]));
        let parsed: Value = serde_json::from_str(&formatted).unwrap();
        assert_eq!(parsed["http"]["msg"], "ok");
        assert_eq!(parsed["msg"], "started");
    }

    #[test]
    fn test_text_format() {
        let formatted = Encoding::Text.encode(&record(vec![
            Field::string("service", "x"),
            Field::string("note", "two words"),
            Field::error("boom"),
        ]));

        assert!(formatted.contains("INFO"));
        assert!(formatted.contains("started"));
        assert!(formatted.contains(" service=x"));
        assert!(formatted.contains(" note=\"two words\""));
        assert!(formatted.contains(" error=boom"));
    }

    #[test]
    fn test_text_groups_use_dotted_keys() {
        let formatted = Encoding::Text.encode(&record(vec![Field::group(
            "req",
            [Field::int("id", 1), Field::bool("cached", false)],
        )]));
        assert!(formatted.ends_with(" req.id=1 req.cached=false"), "{formatted}");
    }

    #[test]
    fn test_text_last_write_wins() {
        let formatted = Encoding::Text.encode(&record(vec![
            Field::int("n", 1),
            Field::int("m", 2),
            Field::int("n", 3),
        ]));
        assert!(formatted.ends_with(" n=3 m=2"), "{formatted}");
    }

    #[test]
    fn test_color_text_wraps_only_the_level() {
        let rec = Record::new(Level::Warn, "disk low", vec![Field::int("free", 3)]);
        let plain = Encoding::Text.encode(&rec);
        let colored = Encoding::ColorText.encode(&rec);

        assert!(!plain.contains('\x1b'), "{plain}");
        assert!(colored.contains("\x1b[33mWARN \x1b[0m disk low free=3"), "{colored:?}");
        assert_eq!(colored.replace("\x1b[33m", "").replace("\x1b[0m", ""), plain);
    }

    #[test]
    fn test_encoding_for_output() {
        assert_eq!(Encoding::for_output(Output::Console), Encoding::Text);
        assert_eq!(Encoding::for_output(Output::File), Encoding::Json);
        assert_eq!(Encoding::for_output(Output::Remote), Encoding::Json);
    }
}
