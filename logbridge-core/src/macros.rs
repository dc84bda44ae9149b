//! Field list shorthand

/// Build a `Vec<Field>` from `key => value` pairs.
///
/// ```ignore
/// logger.inf("request done", &fields!["status" => 200, "path" => "/health"]);
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        ::std::vec::Vec::<$crate::Field>::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Field::from(($key, $value))),+]
    };
}

#[cfg(test)]
mod tests {
    use crate::field::FieldValue;

    #[test]
    fn test_fields_macro() {
        let fields = fields!["service" => "api", "attempt" => 3, "ratio" => 0.5, "ok" => true,];
        let keys: Vec<&str> = fields.iter().map(|f| f.key()).collect();
        assert_eq!(keys, ["service", "attempt", "ratio", "ok"]);
        assert_eq!(fields[0].value(), &FieldValue::Str("api".into()));
        assert_eq!(fields[1].value(), &FieldValue::Int(3));
        assert_eq!(fields[3].value(), &FieldValue::Bool(true));
        assert!(fields![].is_empty());
    }
}
