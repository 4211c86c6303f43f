//! Opaque bearer tokens.
//!
//! A token carries no structure: it is 20 random bytes rendered as 40
//! lowercase hex characters, and is only meaningful as a lookup key.

use rand::RngCore;
use serde::{Deserialize, Serialize};

pub const TOKEN_BYTES: usize = 20;

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Wrap a key presented by a client or loaded from storage.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "AuthToken({prefix}..)")
    }
}
