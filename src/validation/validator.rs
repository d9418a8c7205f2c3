use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use super::rules::{Rule, Rules};
use super::translator::{substitute, TranslationError, Translator};
use crate::coerce;

/// Field name to failure messages, in field order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.errors.get(field).map(Vec::as_slice)
    }

    pub fn first_message(&self) -> Option<&str> {
        self.errors
            .values()
            .flat_map(|messages| messages.iter())
            .next()
            .map(String::as_str)
    }

    /// `"<first message> (and N more errors)"`
    pub fn summary(&self) -> String {
        let total: usize = self.errors.values().map(Vec::len).sum();
        match (self.first_message(), total) {
            (None, _) => "The given data was invalid.".to_string(),
            (Some(first), 1) => first.to_string(),
            (Some(first), 2) => format!("{} (and 1 more error)", first),
            (Some(first), n) => format!("{} (and {} more errors)", first, n - 1),
        }
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.errors
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

impl std::error::Error for ValidationErrors {}

/// Checks request input against per-field rules.
///
/// Construction fails if the translator lacks a message line for any rule in
/// use, so a missing translation surfaces on the first request instead of as
/// a raw key in a response.
pub struct Validator<'t> {
    fields: Vec<(String, Rules)>,
    translator: &'t dyn Translator,
}

impl<'t> Validator<'t> {
    pub fn new<I, S>(fields: I, translator: &'t dyn Translator) -> Result<Self, TranslationError>
    where
        I: IntoIterator<Item = (S, Rules)>,
        S: Into<String>,
    {
        let fields: Vec<(String, Rules)> = fields
            .into_iter()
            .map(|(name, rules)| (name.into(), rules))
            .collect();

        for (_, rules) in &fields {
            for rule in rules.iter() {
                for key in rule.message_keys() {
                    translator.require(key)?;
                }
            }
        }

        Ok(Self { fields, translator })
    }

    /// Returns the declared fields that were present, or every failure.
    pub fn validate(&self, input: &Map<String, Value>) -> Result<Map<String, Value>, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut validated = Map::new();

        for (field, rules) in &self.fields {
            let value = input.get(field);
            let blank = match value {
                None => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(Value::Null) => !rules.has(&Rule::Nullable),
                _ => false,
            };

            if blank {
                if rules.has(&Rule::Required) {
                    errors.add(field, self.message(field, &Rule::Required, "validation.required"));
                } else if let Some(Value::Null) = value {
                    validated.insert(field.clone(), Value::Null);
                }
                continue;
            }

            let Some(value) = value else { continue };
            if value.is_null() {
                // nullable and null: nothing else to check
                validated.insert(field.clone(), Value::Null);
                continue;
            }

            let before = errors.get(field).map_or(0, |messages| messages.len());
            let numeric = rules.has(&Rule::Integer);
            for rule in rules.iter() {
                if let Some(key) = self.failure(field, rule, value, numeric, input) {
                    errors.add(field, self.message(field, rule, key));
                }
            }
            if errors.get(field).map_or(0, |messages| messages.len()) == before {
                validated.insert(field.clone(), value.clone());
            }
        }

        if errors.is_empty() {
            Ok(validated)
        } else {
            Err(errors)
        }
    }

    /// Message key of the failed rule, `None` when it passes
    fn failure(
        &self,
        field: &str,
        rule: &Rule,
        value: &Value,
        numeric: bool,
        input: &Map<String, Value>,
    ) -> Option<&'static str> {
        let key = rule.message_keys().first().copied()?;
        let failed = |fails: bool| fails.then_some(key);
        match rule {
            Rule::Required | Rule::Nullable => None,
            Rule::String => failed(!value.is_string()),
            Rule::Integer => failed(coerce::integer(Some(value), field).is_err()),
            Rule::Boolean => failed(coerce::boolean(Some(value), field).is_err()),
            Rule::Email => failed(!value.as_str().map_or(false, is_email)),
            Rule::Min(min) => match size_of(value, numeric, field)? {
                (size, true) if size < *min as f64 => Some("validation.min.numeric"),
                (size, false) if size < *min as f64 => Some("validation.min.string"),
                _ => None,
            },
            Rule::Max(max) => match size_of(value, numeric, field)? {
                (size, true) if size > *max as f64 => Some("validation.max.numeric"),
                (size, false) if size > *max as f64 => Some("validation.max.string"),
                _ => None,
            },
            Rule::Confirmed => {
                let confirmation = input.get(&format!("{}_confirmation", field));
                failed(confirmation != Some(value))
            }
            Rule::In(allowed) => {
                let candidate = match value {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    Value::Bool(b) => Some(b.to_string()),
                    _ => None,
                };
                failed(!candidate.map_or(false, |c| allowed.contains(&c)))
            }
        }
    }

    fn message(&self, field: &str, rule: &Rule, key: &str) -> String {
        let line = self.translator.get(key).unwrap_or(key);

        let mut replacements = vec![("attribute", self.attribute_name(field))];
        match rule {
            Rule::Min(n) => replacements.push(("min", n.to_string())),
            Rule::Max(n) => replacements.push(("max", n.to_string())),
            Rule::In(values) => replacements.push(("values", values.join(", "))),
            _ => {}
        }
        substitute(line, &replacements)
    }

    fn attribute_name(&self, field: &str) -> String {
        self.translator
            .get(&format!("validation.attributes.{}", field))
            .map(str::to_string)
            .unwrap_or_else(|| field.replace('_', " "))
    }
}

/// Character count of strings, value of numbers; the flag marks numbers.
/// Fields declared as integers are sized by value even when sent as strings.
fn size_of(value: &Value, numeric: bool, field: &str) -> Option<(f64, bool)> {
    if numeric {
        if let Ok(n) = coerce::integer(Some(value), field) {
            return Some((n as f64, true));
        }
    }
    match value {
        Value::String(s) => Some((s.chars().count() as f64, false)),
        Value::Number(n) => n.as_f64().map(|n| (n, true)),
        _ => None,
    }
}

// RFC 5322 local part; dot-separated hostname labels, at least two
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
    )
    .expect("EMAIL_REGEX should be a valid regex pattern")
});

fn is_email(candidate: &str) -> bool {
    EMAIL_REGEX.is_match(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Catalog;
    use serde_json::json;

    fn input(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn missing_translation_key_fails_construction() {
        let catalog = Catalog::new().with("validation.required", "The :attribute field is required.");
        let err = Validator::new([("email", Rules::new().required().email())], &catalog)
            .err()
            .unwrap();
        assert_eq!(err, TranslationError::MissingKey("validation.email".to_string()));
    }

    #[test]
    fn required_fields_report_missing_and_blank() {
        let catalog = Catalog::english();
        let validator = Validator::new(
            [
                ("email", Rules::new().required().email()),
                ("password", Rules::new().required().string()),
            ],
            &catalog,
        )
        .unwrap();

        let errors = validator.validate(&input(json!({ "email": "  " }))).unwrap_err();
        assert_eq!(errors.get("email").unwrap(), ["The email field is required."]);
        assert_eq!(errors.get("password").unwrap(), ["The password field is required."]);
        assert_eq!(errors.summary(), "The email field is required. (and 1 more error)");
    }

    #[test]
    fn size_rules_pick_string_or_numeric_lines() {
        let catalog = Catalog::english();
        let validator = Validator::new(
            [
                ("password", Rules::new().required().string().min(8)),
                ("per_page", Rules::new().integer().max(50)),
            ],
            &catalog,
        )
        .unwrap();

        let errors = validator
            .validate(&input(json!({ "password": "short", "per_page": 99 })))
            .unwrap_err();
        assert_eq!(
            errors.get("password").unwrap(),
            ["The password field must be at least 8 characters."]
        );
        assert_eq!(
            errors.get("per_page").unwrap(),
            ["The per page field must not be greater than 50."]
        );
    }

    #[test]
    fn integer_fields_sent_as_strings_are_sized_by_value() {
        let catalog = Catalog::english();
        let validator =
            Validator::new([("per_page", Rules::new().integer().min(1).max(50))], &catalog).unwrap();
        assert!(validator.validate(&input(json!({ "per_page": "25" }))).is_ok());
        let errors = validator.validate(&input(json!({ "per_page": "99" }))).unwrap_err();
        assert_eq!(
            errors.get("per_page").unwrap(),
            ["The per page field must not be greater than 50."]
        );
    }

    #[test]
    fn confirmed_uses_attribute_overrides() {
        let catalog = Catalog::english();
        let validator = Validator::new(
            [("current_password", Rules::new().required().confirmed())],
            &catalog,
        )
        .unwrap();
        let errors = validator
            .validate(&input(json!({ "current_password": "a", "current_password_confirmation": "b" })))
            .unwrap_err();
        assert_eq!(
            errors.get("current_password").unwrap(),
            ["The current password field confirmation does not match."]
        );
    }

    #[test]
    fn passing_input_returns_only_declared_fields() {
        let catalog = Catalog::english();
        let validator = Validator::new(
            [
                ("email", Rules::new().required().email()),
                ("remember", Rules::new().boolean()),
                ("role", Rules::new().nullable().one_of(["admin", "member"])),
            ],
            &catalog,
        )
        .unwrap();

        let validated = validator
            .validate(&input(json!({
                "email": "ada@example.com",
                "remember": "on",
                "role": null,
                "extra": true
            })))
            .unwrap();
        assert_eq!(validated.get("email"), Some(&json!("ada@example.com")));
        assert_eq!(validated.get("remember"), Some(&json!("on")));
        assert_eq!(validated.get("role"), Some(&Value::Null));
        assert!(validated.get("extra").is_none());
    }

    #[test]
    fn in_rule_rejects_unknown_values() {
        let catalog = Catalog::english();
        let validator =
            Validator::new([("role", Rules::new().one_of(["admin", "member"]))], &catalog).unwrap();
        let errors = validator.validate(&input(json!({ "role": "owner" }))).unwrap_err();
        assert_eq!(errors.get("role").unwrap(), ["The selected role is invalid."]);
    }

    #[test]
    fn email_shape() {
        assert!(is_email("ada@example.com"));
        assert!(!is_email("ada@example"));
        assert!(!is_email("ada example@example.com"));
        assert!(!is_email("@example.com"));
        assert!(!is_email("a@b@example.com"));
        assert!(!is_email("ada@example..com"));
        assert!(!is_email("ada@.example.com"));
        assert!(!is_email("ada@-example.com"));
        assert!(is_email("ada.lovelace+tag@mail.example.co.uk"));
    }
}
