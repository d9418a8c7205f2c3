use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TranslationError {
    #[error("translation key '{0}' is not defined")]
    MissingKey(String),
}

/// Resolves translation keys to message lines
pub trait Translator: Send + Sync {
    fn get(&self, key: &str) -> Option<&str>;

    /// Like `get`, but a missing key is an error rather than a fallback
    fn require(&self, key: &str) -> Result<&str, TranslationError> {
        self.get(key)
            .ok_or_else(|| TranslationError::MissingKey(key.to_string()))
    }
}

/// In-memory catalog of message lines
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    lines: HashMap<String, String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, line: impl Into<String>) -> Self {
        self.lines.insert(key.into(), line.into());
        self
    }

    /// Built-in English validation lines
    pub fn english() -> Self {
        Self::new()
            .with("validation.required", "The :attribute field is required.")
            .with("validation.string", "The :attribute field must be a string.")
            .with("validation.integer", "The :attribute field must be an integer.")
            .with("validation.boolean", "The :attribute field must be true or false.")
            .with("validation.email", "The :attribute field must be a valid email address.")
            .with("validation.min.string", "The :attribute field must be at least :min characters.")
            .with("validation.min.numeric", "The :attribute field must be at least :min.")
            .with("validation.max.string", "The :attribute field must not be greater than :max characters.")
            .with("validation.max.numeric", "The :attribute field must not be greater than :max.")
            .with("validation.confirmed", "The :attribute field confirmation does not match.")
            .with("validation.in", "The selected :attribute is invalid.")
            .with("validation.attributes.password_confirmation", "password confirmation")
            .with("validation.attributes.current_password", "current password")
            .with("auth.failed", "These credentials do not match our records.")
            .with("auth.throttle", "Too many login attempts. Please try again in :seconds seconds.")
            .with("auth.password", "The provided password is incorrect.")
    }
}

impl Translator for Catalog {
    fn get(&self, key: &str) -> Option<&str> {
        self.lines.get(key).map(String::as_str)
    }
}

/// Replace `:name` placeholders, longest names first so `:max` never eats `:maximum`
pub fn substitute(line: &str, replacements: &[(&str, String)]) -> String {
    let mut ordered: Vec<&(&str, String)> = replacements.iter().collect();
    ordered.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    let mut out = line.to_string();
    for (name, value) in ordered {
        out = out.replace(&format!(":{}", name), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_reports_missing_keys() {
        let catalog = Catalog::new().with("a.b", "line");
        assert_eq!(catalog.require("a.b").unwrap(), "line");
        assert_eq!(
            catalog.require("a.c"),
            Err(TranslationError::MissingKey("a.c".to_string()))
        );
    }

    #[test]
    fn substitutes_longest_placeholder_first() {
        let line = substitute(
            ":attribute between :min and :minimum",
            &[("min", "1".into()), ("minimum", "9".into()), ("attribute", "age".into())],
        );
        assert_eq!(line, "age between 1 and 9");
    }
}
