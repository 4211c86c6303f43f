use chrono::{DateTime, Utc};
use serde::Deserialize;

use profilehub_auth::{Owned, PasswordHash};
use profilehub_core::{DomainError, DomainResult, Email, Entity, FieldErrors, ProfileId};

use crate::search::SearchQuery;

pub const EMAIL_MAX_LEN: usize = 255;
pub const NAME_MAX_LEN: usize = 255;
pub const PASSWORD_MAX_LEN: usize = 128;

/// Raw profile fields as submitted by a client.
///
/// Every field is optional so that the same shape serves registration, full
/// replacement and partial update; which fields are required depends on the
/// operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileInput {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

/// A registered identity.
///
/// # Invariants
/// - `email` is syntactically valid and normalized (uniqueness is enforced by the store).
/// - `name` is non-blank and at most `NAME_MAX_LEN` characters.
/// - The password is only ever held as a salted hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    id: ProfileId,
    email: Email,
    name: String,
    password: PasswordHash,
    is_active: bool,
    is_staff: bool,
    is_superuser: bool,
    created_at: DateTime<Utc>,
}

/// Fields that passed validation, not yet applied.
#[derive(Default)]
struct CleanFields {
    email: Option<Email>,
    name: Option<String>,
    password: Option<String>,
}

impl UserProfile {
    /// Self-registration: email, name and password are all required.
    pub fn register(input: &ProfileInput, now: DateTime<Utc>) -> DomainResult<Self> {
        let clean = clean(input, true)?;
        let (Some(email), Some(name), Some(password)) = (clean.email, clean.name, clean.password) else {
            return Err(DomainError::validation("incomplete profile"));
        };

        Ok(Self {
            id: ProfileId::new(),
            email,
            name,
            password: hash(&password)?,
            is_active: true,
            is_staff: false,
            is_superuser: false,
            created_at: now,
        })
    }

    /// Administrative creation of a staff superuser.
    pub fn superuser(input: &ProfileInput, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut profile = Self::register(input, now)?;
        profile.is_staff = true;
        profile.is_superuser = true;
        Ok(profile)
    }

    /// Rehydrate a profile from storage.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: ProfileId,
        email: Email,
        name: String,
        password: PasswordHash,
        is_active: bool,
        is_staff: bool,
        is_superuser: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email,
            name,
            password,
            is_active,
            is_staff,
            is_superuser,
            created_at,
        }
    }

    /// Apply an update. A full update (`partial == false`) requires every
    /// field; a partial update touches only the fields present.
    ///
    /// Nothing is changed unless every supplied field is valid.
    pub fn apply(&mut self, input: &ProfileInput, partial: bool) -> DomainResult<()> {
        let clean = clean(input, !partial)?;

        let password = match clean.password {
            Some(raw) => Some(hash(&raw)?),
            None => None,
        };
        if let Some(email) = clean.email {
            self.email = email;
        }
        if let Some(name) = clean.name {
            self.name = name;
        }
        if let Some(password) = password {
            self.password = password;
        }
        Ok(())
    }

    pub fn check_password(&self, password: &str) -> bool {
        self.password.verify(password)
    }

    pub fn matches(&self, query: &SearchQuery) -> bool {
        query.matches(&[&self.name, self.email.as_str()])
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn password_hash(&self) -> &PasswordHash {
        &self.password
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_staff(&self) -> bool {
        self.is_staff
    }

    pub fn is_superuser(&self) -> bool {
        self.is_superuser
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Entity for UserProfile {
    type Id = ProfileId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Owned for UserProfile {
    fn owner(&self) -> ProfileId {
        self.id
    }
}

fn clean(input: &ProfileInput, require_all: bool) -> DomainResult<CleanFields> {
    let mut errors = FieldErrors::new();
    let mut clean = CleanFields::default();

    let (email, name, password) = if require_all {
        (
            errors.require("email", input.email.as_deref()),
            errors.require("name", input.name.as_deref()),
            errors.require("password", input.password.as_deref()),
        )
    } else {
        (input.email.as_deref(), input.name.as_deref(), input.password.as_deref())
    };

    if let Some(raw) = email {
        if let Some(text) = errors.text("email", raw, EMAIL_MAX_LEN, true) {
            match Email::parse(&text) {
                Ok(email) => clean.email = Some(email),
                Err(msg) => errors.add("email", msg),
            }
        }
    }
    if let Some(raw) = name {
        clean.name = errors.text("name", raw, NAME_MAX_LEN, true);
    }
    if let Some(raw) = password {
        clean.password = errors.text("password", raw, PASSWORD_MAX_LEN, false);
    }

    errors.into_result(clean).map_err(DomainError::from)
}

fn hash(password: &str) -> DomainResult<PasswordHash> {
    PasswordHash::create(password).map_err(|e| DomainError::field("password", e.to_string()))
}
