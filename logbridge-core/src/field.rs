//! Structured fields attached to log records
//!
//! A [`Field`] is one immutable key/value pair. The value set is closed
//! ([`FieldValue`]) so every encoder matches it exhaustively.

use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Key used by [`Field::error`].
pub const ERROR_KEY: &str = "error";

/// One structured key/value pair
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    key: String,
    value: FieldValue,
}

/// The value carried by a [`Field`]
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Any serializable value, captured at construction
    Any(serde_json::Value),
    Error(ErrorValue),
    /// Named sub-list, rendered as a nested object
    Group(Vec<Field>),
}

impl Field {
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: FieldValue::Str(value.into()) }
    }

    pub fn int(key: impl Into<String>, value: i64) -> Self {
        Self { key: key.into(), value: FieldValue::Int(value) }
    }

    pub fn float(key: impl Into<String>, value: f64) -> Self {
        Self { key: key.into(), value: FieldValue::Float(value) }
    }

    pub fn bool(key: impl Into<String>, value: bool) -> Self {
        Self { key: key.into(), value: FieldValue::Bool(value) }
    }

    /// Capture any serializable value.
    ///
    /// Serialization happens here, once. A value that fails to serialize is
    /// kept as the serializer's error message.
    pub fn any<T: Serialize + ?Sized>(key: impl Into<String>, value: &T) -> Self {
        let value = serde_json::to_value(value)
            .unwrap_or_else(|err| serde_json::Value::String(format!("!serialize: {err}")));
        Self { key: key.into(), value: FieldValue::Any(value) }
    }

    /// An error, always keyed `"error"`.
    pub fn error(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self { key: ERROR_KEY.to_string(), value: FieldValue::Error(ErrorValue::new(err)) }
    }

    /// A named group of fields, rendered as a nested object.
    pub fn group(key: impl Into<String>, fields: impl IntoIterator<Item = Field>) -> Self {
        Self { key: key.into(), value: FieldValue::Group(fields.into_iter().collect()) }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }
}

impl<K, V> From<(K, V)> for Field
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from((key, value): (K, V)) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<f32> for FieldValue {
    fn from(v: f32) -> Self {
        FieldValue::Float(f64::from(v))
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(v: serde_json::Value) -> Self {
        FieldValue::Any(v)
    }
}

macro_rules! int_from {
    ($($t:ty),*) => {
        $(impl From<$t> for FieldValue {
            fn from(v: $t) -> Self {
                FieldValue::Int(i64::from(v))
            }
        })*
    };
}

int_from!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! wide_int_from {
    ($($t:ty),*) => {
        $(impl From<$t> for FieldValue {
            fn from(v: $t) -> Self {
                match i64::try_from(v) {
                    Ok(n) => FieldValue::Int(n),
                    Err(_) => FieldValue::Any(serde_json::Value::from(v)),
                }
            }
        })*
    };
}

wide_int_from!(u64, usize, isize);

/// Shareable error captured by [`Field::error`]
#[derive(Clone)]
pub struct ErrorValue(Arc<dyn StdError + Send + Sync>);

impl ErrorValue {
    fn new(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self(Arc::from(err.into()))
    }

    /// Message of the outermost error.
    pub fn message(&self) -> String {
        self.0.to_string()
    }

    /// The outermost message followed by every source, joined with `": "`.
    pub fn render(&self) -> String {
        let mut out = self.0.to_string();
        let mut source = self.0.source();
        while let Some(cause) = source {
            out.push_str(": ");
            out.push_str(&cause.to_string());
            source = cause.source();
        }
        out
    }
}

impl fmt::Debug for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ErrorValue").field(&self.render()).finish()
    }
}

impl PartialEq for ErrorValue {
    fn eq(&self, other: &Self) -> bool {
        self.render() == other.render()
    }
}

/// Persistent context accumulated by `with` and `group`
///
/// Frame 0 is the root; every later frame is an open named group nested in
/// the one before it. Deriving a scope clones the frame list, so a parent
/// is never affected by its children.
#[derive(Clone, Debug, PartialEq)]
pub struct Scope {
    frames: Vec<Frame>,
}

#[derive(Clone, Debug, PartialEq)]
struct Frame {
    name: String,
    fields: Vec<Field>,
}

impl Default for Scope {
    fn default() -> Self {
        Self { frames: vec![Frame { name: String::new(), fields: Vec::new() }] }
    }
}

impl Scope {
    /// Append fields to the innermost open group.
    pub fn with(&self, fields: impl IntoIterator<Item = Field>) -> Self {
        let mut next = self.clone();
        if let Some(frame) = next.frames.last_mut() {
            frame.fields.extend(fields);
        }
        next
    }

    /// Open a new group nested in the innermost one.
    pub fn group(&self, name: impl Into<String>, fields: impl IntoIterator<Item = Field>) -> Self {
        let name = name.into();
        if name.is_empty() {
            return self.with(fields);
        }
        let mut next = self.clone();
        next.frames.push(Frame { name, fields: fields.into_iter().collect() });
        next
    }

    /// Fold the scope and the call-site fields into one ordered list.
    ///
    /// Call-site fields land in the innermost group; empty groups vanish.
    pub fn render(&self, call_site: &[Field]) -> Vec<Field> {
        let mut idx = self.frames.len() - 1;
        let mut acc = self.frames[idx].fields.clone();
        acc.extend_from_slice(call_site);
        while idx > 0 {
            let mut outer = self.frames[idx - 1].fields.clone();
            if !acc.is_empty() {
                outer.push(Field::group(self.frames[idx].name.clone(), acc));
            }
            acc = outer;
            idx -= 1;
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Outer(std::io::Error);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("query failed")
        }
    }

    impl StdError for Outer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_constructors_set_kind_once() {
        assert_eq!(Field::string("a", "b").value(), &FieldValue::Str("b".into()));
        assert_eq!(Field::int("n", 3).value(), &FieldValue::Int(3));
        assert_eq!(Field::bool("ok", true).value(), &FieldValue::Bool(true));
        assert_eq!(Field::any("v", &[1, 2]).value(), &FieldValue::Any(serde_json::json!([1, 2])));
    }

    #[test]
    fn test_error_field_renders_chain() {
        let err = Outer(std::io::Error::other("connection reset"));
        let field = Field::error(err);
        assert_eq!(field.key(), ERROR_KEY);
        match field.value() {
            FieldValue::Error(e) => {
                assert_eq!(e.message(), "query failed");
                assert_eq!(e.render(), "query failed: connection reset");
            }
            other => panic!("unexpected value {other:?}"),
        }
    }

    #[test]
    fn test_tuple_conversion() {
        let f: Field = ("port", 8080u16).into();
        assert_eq!(f.value(), &FieldValue::Int(8080));
        let big: Field = ("big", u64::MAX).into();
        assert!(matches!(big.value(), FieldValue::Any(_)));
    }

    #[test]
    fn test_scope_is_copy_on_write() {
        let base = Scope::default().with([Field::int("a", 1)]);
        let child = base.with([Field::int("b", 2)]);
        assert_eq!(base.render(&[]), vec![Field::int("a", 1)]);
        assert_eq!(child.render(&[]), vec![Field::int("a", 1), Field::int("b", 2)]);
    }

    #[test]
    fn test_scope_groups_nest_call_site_fields() {
        let scope = Scope::default()
            .with([Field::string("svc", "api")])
            .group("req", [Field::int("id", 7)]);
        let rendered = scope.render(&[Field::int("status", 200)]);
        assert_eq!(
            rendered,
            vec![
                Field::string("svc", "api"),
                Field::group("req", [Field::int("id", 7), Field::int("status", 200)]),
            ]
        );
    }

    #[test]
    fn test_empty_group_is_omitted() {
        let scope = Scope::default().group("empty", []);
        assert!(scope.render(&[]).is_empty());
    }
}
