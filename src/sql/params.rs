//! Convert validated serde_json values to text parameters.
//!
//! Every parameter is bound as TEXT and cast in SQL (`$n::int4`, `$n::numeric`, ...),
//! so one bind type covers every column kind.

use serde_json::Value;

/// Text form of a JSON scalar for binding. `None` binds SQL NULL.
pub fn bind_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => Some(v.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_bind_as_text() {
        assert_eq!(bind_text(&json!(null)), None);
        assert_eq!(bind_text(&json!(true)).as_deref(), Some("true"));
        assert_eq!(bind_text(&json!(42)).as_deref(), Some("42"));
        assert_eq!(bind_text(&json!(15.5)).as_deref(), Some("15.5"));
        assert_eq!(bind_text(&json!("2024-03-01")).as_deref(), Some("2024-03-01"));
    }
}
