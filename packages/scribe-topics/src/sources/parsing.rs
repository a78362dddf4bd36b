//! Coercion helpers for walking untrusted, inconsistently-shaped JSON from
//! the four hot-list providers. Sits directly on `serde_json::Value` rather
//! than introducing a parallel dynamic-value type.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

pub fn as_map(v: &Value) -> Option<&serde_json::Map<String, Value>> {
    v.as_object()
}

pub fn as_list(v: &Value) -> Option<&Vec<Value>> {
    v.as_array()
}

/// Stringify strings/numbers/bools; anything else (null, object, array) is
/// not representable as a single scalar.
pub fn as_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn as_int(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parses numbers and numeric strings, tolerating thousands separators.
pub fn as_float(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)").unwrap());

/// Last-resort extraction: pulls the first numeric substring out of
/// decorated text like `"12.3万"` or `"热度 8,492"`.
pub fn try_parse_float_from_text(text: &str) -> Option<f64> {
    let stripped = text.replace(',', "");
    NUMBER_RE
        .captures(&stripped)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// `None` for blank/whitespace-only strings, trimmed `Some` otherwise.
pub fn non_blank(s: impl Into<String>) -> Option<String> {
    let s = s.into();
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn as_string_stringifies_numbers_and_bools() {
        assert_eq!(as_string(&json!(42.0)), Some("42".to_string()));
        assert_eq!(as_string(&json!(true)), Some("true".to_string()));
        assert_eq!(as_string(&json!("hi")), Some("hi".to_string()));
        assert_eq!(as_string(&json!(null)), None);
    }

    #[test]
    fn as_float_strips_thousands_separators() {
        assert_eq!(as_float(&json!("12,345.5")), Some(12345.5));
    }

    #[test]
    fn try_parse_float_from_text_finds_first_number() {
        assert_eq!(try_parse_float_from_text("热度 8,492 today"), Some(8492.0));
        assert_eq!(try_parse_float_from_text("no numbers here"), None);
    }

    #[test]
    fn non_blank_rejects_whitespace_only() {
        assert_eq!(non_blank("   "), None);
        assert_eq!(non_blank("  hi  "), Some("hi".to_string()));
    }
}
