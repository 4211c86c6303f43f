//! Field-level validation helpers shared by the domain crates.
//!
//! Errors are collected per field so a single response can report every
//! problem with a request body at once.

use std::collections::BTreeMap;

use serde::Serialize;

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const NULL: &str = "This field may not be null.";
pub const NOT_A_STRING: &str = "Not a valid string.";

pub fn max_length_message(max: usize) -> String {
    format!("Ensure this field has no more than {max} characters.")
}

/// Validation messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, msg: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(msg.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// `Ok(value)` when nothing was recorded, otherwise the collected errors.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }

    /// Record a "required" error when `value` is absent.
    pub fn require<'a>(&mut self, field: &str, value: Option<&'a str>) -> Option<&'a str> {
        if value.is_none() {
            self.add(field, REQUIRED);
        }
        value
    }

    /// Validate a free-text field: non-blank and at most `max_len` characters.
    ///
    /// When `trim` is set, surrounding whitespace is stripped before the checks
    /// and the stripped value is returned.
    pub fn text(&mut self, field: &str, value: &str, max_len: usize, trim: bool) -> Option<String> {
        let value = if trim { value.trim() } else { value };
        if value.trim().is_empty() {
            self.add(field, BLANK);
            return None;
        }
        if value.chars().count() > max_len {
            self.add(field, max_length_message(max_len));
            return None;
        }
        Some(value.to_string())
    }
}

impl core::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for msg in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {msg}")?;
                first = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_trims_and_accepts() {
        let mut errors = FieldErrors::new();
        assert_eq!(errors.text("name", "  Ada  ", 10, true).as_deref(), Some("Ada"));
        assert!(errors.is_empty());
    }

    #[test]
    fn text_rejects_blank_and_long_values() {
        let mut errors = FieldErrors::new();
        assert!(errors.text("name", "   ", 10, true).is_none());
        assert!(errors.text("status_text", "abcdefghijk", 10, true).is_none());
        assert_eq!(errors.get("name"), Some(&[BLANK.to_string()][..]));
        assert_eq!(
            errors.get("status_text"),
            Some(&[max_length_message(10)][..])
        );
    }

    #[test]
    fn untrimmed_text_keeps_whitespace() {
        let mut errors = FieldErrors::new();
        assert_eq!(errors.text("password", " secret ", 128, false).as_deref(), Some(" secret "));
    }

    #[test]
    fn require_records_missing_fields() {
        let mut errors = FieldErrors::new();
        assert!(errors.require("email", None).is_none());
        assert_eq!(errors.require("name", Some("x")), Some("x"));
        assert_eq!(errors.to_string(), format!("email: {REQUIRED}"));
        assert!(errors.into_result(()).is_err());
    }

    #[test]
    fn serializes_as_plain_map() {
        let mut errors = FieldErrors::new();
        errors.add("email", "Enter a valid email address.");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({ "email": ["Enter a valid email address."] }));
    }
}
