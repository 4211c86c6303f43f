//! Email address value object (the identity key of a profile).

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::value_object::ValueObject;

pub const INVALID_EMAIL: &str = "Enter a valid email address.";

/// A syntactically valid, normalized email address.
///
/// Normalization lower-cases the domain part only; the local part is kept as
/// given, so `Ada@Example.COM` becomes `Ada@example.com`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> Result<Self, &'static str> {
        let raw = raw.trim();
        let (local, domain) = raw.rsplit_once('@').ok_or(INVALID_EMAIL)?;

        if local.is_empty() || local.contains('@') || local.chars().any(char::is_whitespace) {
            return Err(INVALID_EMAIL);
        }
        if !valid_domain(domain) {
            return Err(INVALID_EMAIL);
        }

        Ok(Self(format!("{local}@{}", domain.to_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn valid_domain(domain: &str) -> bool {
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
}

impl ValueObject for Email {}

impl core::fmt::Display for Email {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Email {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Email {
    type Error = &'static str;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_domain_only() {
        let email = Email::parse("  Ada.Lovelace@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "Ada.Lovelace@example.com");
    }

    #[test]
    fn rejects_malformed_addresses() {
        for raw in ["", "ada", "@example.com", "ada@", "ada@localhost", "a da@example.com", "ada@exa_mple.com", "ada@-x.com"] {
            assert_eq!(Email::parse(raw), Err(INVALID_EMAIL), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn deserializes_through_validation() {
        let ok: Result<Email, _> = serde_json::from_str("\"bob@example.org\"");
        assert!(ok.is_ok());
        let bad: Result<Email, _> = serde_json::from_str("\"bob\"");
        assert!(bad.is_err());
    }
}
