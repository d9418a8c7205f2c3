//! Typed coercion of loosely-typed request values.
//!
//! Request bodies and query strings arrive as JSON values or strings. These
//! helpers narrow them to concrete types and report which field was wrong,
//! instead of trusting the shape and panicking later.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoerceError {
    #[error("{field} is missing")]
    Missing { field: String },

    #[error("{field} must be {expected}")]
    WrongType { field: String, expected: &'static str },

    #[error("{field} is out of range")]
    OutOfRange { field: String },
}

impl CoerceError {
    pub fn field(&self) -> &str {
        match self {
            CoerceError::Missing { field }
            | CoerceError::WrongType { field, .. }
            | CoerceError::OutOfRange { field } => field,
        }
    }
}

fn wrong(field: &str, expected: &'static str) -> CoerceError {
    CoerceError::WrongType { field: field.to_string(), expected }
}

/// Required string. Numbers are not silently stringified.
pub fn string(value: Option<&Value>, field: &str) -> Result<String, CoerceError> {
    match value {
        None | Some(Value::Null) => Err(CoerceError::Missing { field: field.to_string() }),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(wrong(field, "a string")),
    }
}

pub fn optional_string(value: Option<&Value>, field: &str) -> Result<Option<String>, CoerceError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        other => string(other, field).map(Some),
    }
}

/// Accepts JSON integers and integer-looking strings.
pub fn integer(value: Option<&Value>, field: &str) -> Result<i64, CoerceError> {
    match value {
        None | Some(Value::Null) => Err(CoerceError::Missing { field: field.to_string() }),
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| wrong(field, "an integer")),
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| wrong(field, "an integer")),
        Some(_) => Err(wrong(field, "an integer")),
    }
}

pub fn positive_integer(value: Option<&Value>, field: &str) -> Result<u64, CoerceError> {
    let n = integer(value, field)?;
    if n < 1 {
        return Err(CoerceError::OutOfRange { field: field.to_string() });
    }
    Ok(n as u64)
}

/// Accepts booleans plus the form-encoded spellings `1/0`, `true/false`, `on/off`, `yes/no`.
pub fn boolean(value: Option<&Value>, field: &str) -> Result<bool, CoerceError> {
    match value {
        None | Some(Value::Null) => Err(CoerceError::Missing { field: field.to_string() }),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(wrong(field, "a boolean")),
        },
        Some(Value::String(s)) => match s.to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => Ok(true),
            "0" | "false" | "off" | "no" | "" => Ok(false),
            _ => Err(wrong(field, "a boolean")),
        },
        Some(_) => Err(wrong(field, "a boolean")),
    }
}

pub fn string_list(value: Option<&Value>, field: &str) -> Result<Vec<String>, CoerceError> {
    match value {
        None | Some(Value::Null) => Err(CoerceError::Missing { field: field.to_string() }),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                _ => Err(wrong(field, "a list of strings")),
            })
            .collect(),
        Some(_) => Err(wrong(field, "a list of strings")),
    }
}

/// Parse a primary key from a path segment, query parameter or bearer prefix.
pub fn parse_id(raw: &str, field: &str) -> Result<i64, CoerceError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(wrong(field, "a numeric id"));
    }
    raw.parse::<i64>()
        .map_err(|_| CoerceError::OutOfRange { field: field.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_rejects_numbers_and_missing() {
        let body = json!({ "email": "a@b.c", "age": 4 });
        assert_eq!(string(body.get("email"), "email").unwrap(), "a@b.c");
        assert_eq!(
            string(body.get("age"), "age"),
            Err(CoerceError::WrongType { field: "age".into(), expected: "a string" })
        );
        assert!(matches!(string(body.get("name"), "name"), Err(CoerceError::Missing { .. })));
        assert_eq!(optional_string(body.get("name"), "name").unwrap(), None);
    }

    #[test]
    fn integer_accepts_numeric_strings() {
        assert_eq!(integer(Some(&json!("42")), "page").unwrap(), 42);
        assert_eq!(integer(Some(&json!(7)), "page").unwrap(), 7);
        assert!(integer(Some(&json!(1.5)), "page").is_err());
        assert!(positive_integer(Some(&json!(0)), "page").is_err());
    }

    #[test]
    fn boolean_accepts_form_spellings() {
        assert!(boolean(Some(&json!("on")), "remember").unwrap());
        assert!(!boolean(Some(&json!(0)), "remember").unwrap());
        assert!(boolean(Some(&json!("maybe")), "remember").is_err());
    }

    #[test]
    fn parse_id_requires_digits_only() {
        assert_eq!(parse_id("7", "id").unwrap(), 7);
        assert!(parse_id("-7", "id").is_err());
        assert!(parse_id("7a", "id").is_err());
        assert!(parse_id("", "id").is_err());
        assert!(matches!(parse_id("99999999999999999999", "id"), Err(CoerceError::OutOfRange { .. })));
    }

    #[test]
    fn string_list_checks_every_item() {
        assert_eq!(string_list(Some(&json!(["a", "b"])), "tags").unwrap(), vec!["a", "b"]);
        assert!(string_list(Some(&json!(["a", 1])), "tags").is_err());
    }
}
