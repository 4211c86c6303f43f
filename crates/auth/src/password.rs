//! Password hashing and verification using Argon2id.

use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2, PasswordVerifier,
};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DUMMY_PASSWORD: &str = "profilehub-timing-equalizer";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("failed to hash password")]
    Hashing,

    #[error("stored password hash is malformed")]
    MalformedHash,
}

/// A salted Argon2 hash in PHC string format (algorithm, parameters, salt, digest).
///
/// The plaintext never leaves `create`/`verify`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hash a plaintext password with a fresh random salt.
    pub fn create(password: &str) -> Result<Self, PasswordError> {
        let salt = SaltString::generate(rand::thread_rng());
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|_| PasswordError::Hashing)?
            .to_string();
        Ok(Self(hash))
    }

    /// Wrap a PHC string loaded from storage, checking that it parses.
    pub fn from_phc(phc: impl Into<String>) -> Result<Self, PasswordError> {
        let phc = phc.into();
        argon2::PasswordHash::new(&phc).map_err(|_| PasswordError::MalformedHash)?;
        Ok(Self(phc))
    }

    pub fn verify(&self, password: &str) -> bool {
        match argon2::PasswordHash::new(&self.0) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A fixed hash that no real credential is checked against.
    ///
    /// Verifying a password against it costs the same as a real check, so a
    /// login for an unknown account takes as long as a wrong password.
    /// Built on first use; `None` only if hashing itself is broken.
    pub fn dummy() -> Option<&'static PasswordHash> {
        static DUMMY: OnceLock<Option<PasswordHash>> = OnceLock::new();
        DUMMY
            .get_or_init(|| PasswordHash::create(DUMMY_PASSWORD).ok())
            .as_ref()
    }

    /// Spend one verification on the dummy hash. Always reports a mismatch.
    pub fn verify_dummy(password: &str) -> bool {
        if let Some(dummy) = Self::dummy() {
            let _ = dummy.verify(password);
        }
        false
    }
}

impl core::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}
