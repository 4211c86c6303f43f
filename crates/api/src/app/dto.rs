use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::Deserialize;
use serde_json::{Map, Value};

use profilehub_core::validation::{NOT_A_STRING, NULL};
use profilehub_core::{Entity, FieldErrors};
use profilehub_feed::{FeedItemInput, ProfileFeedItem};
use profilehub_profiles::{ProfileInput, UserProfile};

use crate::app::errors::ApiError;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    /// Both fields are required and may not be blank.
    pub fn credentials(&self) -> Result<(&str, &str), ApiError> {
        let mut errors = FieldErrors::new();
        let email = required(&mut errors, "email", self.email.as_deref());
        let password = required(&mut errors, "password", self.password.as_deref());
        match (email, password) {
            (Some(email), Some(password)) if errors.is_empty() => Ok((email, password)),
            _ => Err(ApiError::Invalid(errors)),
        }
    }
}

#[derive(Debug, Default)]
pub struct HelloRequest {
    pub name: Option<String>,
}

pub const HELLO_NAME_MAX_LEN: usize = 10;

impl HelloRequest {
    pub fn name(&self) -> Result<String, ApiError> {
        let mut errors = FieldErrors::new();
        let name = errors
            .require("name", self.name.as_deref())
            .and_then(|name| errors.text("name", name, HELLO_NAME_MAX_LEN, true));
        match name {
            Some(name) => Ok(name),
            None => Err(ApiError::Invalid(errors)),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub search: Option<String>,
}

fn required<'a>(errors: &mut FieldErrors, field: &str, value: Option<&'a str>) -> Option<&'a str> {
    let value = errors.require(field, value)?;
    if value.trim().is_empty() {
        errors.add(field, profilehub_core::validation::BLANK);
        return None;
    }
    Some(value)
}

// -------------------------
// Request bodies
// -------------------------

/// The undecoded request body.
///
/// Handlers decode it only after the caller has been authorized, so a
/// rejected caller gets 401/403 whatever they sent. The content type is
/// ignored and an empty body reads as `{}`.
#[derive(Debug, Clone, Default)]
pub struct RawBody(pub Bytes);

#[async_trait]
impl<S> FromRequest<S> for RawBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Bytes::from_request(req, state)
            .await
            .map(RawBody)
            .map_err(|e| ApiError::Malformed(e.body_text()))
    }
}

impl RawBody {
    /// Parse the body as a JSON object.
    ///
    /// Only unparsable JSON and non-object documents are `Malformed`;
    /// everything else is left to per-field decoding.
    pub fn object(&self) -> Result<Map<String, Value>, ApiError> {
        if self.0.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }
        let value: Value = serde_json::from_slice(&self.0)
            .map_err(|e| ApiError::Malformed(format!("JSON parse error - {e}")))?;
        match value {
            Value::Object(map) => Ok(map),
            other => Err(ApiError::Malformed(format!(
                "Invalid data. Expected a dictionary, but got {}.",
                json_kind(&other)
            ))),
        }
    }

    /// Decode into `T`, reporting every mistyped field at once.
    pub fn decode<T: FromBody>(&self) -> Result<T, ApiError> {
        let object = self.object()?;
        let mut fields = BodyFields {
            object: &object,
            errors: FieldErrors::new(),
        };
        let value = T::from_fields(&mut fields);
        fields.errors.into_result(value).map_err(ApiError::Invalid)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Typed access to the members of a JSON object body.
///
/// Unknown members are ignored.
pub struct BodyFields<'a> {
    object: &'a Map<String, Value>,
    errors: FieldErrors,
}

impl BodyFields<'_> {
    /// A text member. Numbers are accepted in their JSON spelling; `null`
    /// and other types are recorded as errors against the field.
    pub fn string(&mut self, field: &str) -> Option<String> {
        match self.object.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Null => {
                self.errors.add(field, NULL);
                None
            }
            _ => {
                self.errors.add(field, NOT_A_STRING);
                None
            }
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.object.contains_key(field)
    }
}

/// Request types built from a JSON object body.
pub trait FromBody: Sized {
    fn from_fields(fields: &mut BodyFields<'_>) -> Self;
}

impl FromBody for ProfileInput {
    fn from_fields(fields: &mut BodyFields<'_>) -> Self {
        Self {
            email: fields.string("email"),
            name: fields.string("name"),
            password: fields.string("password"),
        }
    }
}

/// `user_profile` is read-only and never decoded.
impl FromBody for FeedItemInput {
    fn from_fields(fields: &mut BodyFields<'_>) -> Self {
        Self {
            status_text: fields.string("status_text"),
        }
    }
}

/// `username` is accepted in place of `email`.
impl FromBody for LoginRequest {
    fn from_fields(fields: &mut BodyFields<'_>) -> Self {
        let email = if fields.contains("email") {
            fields.string("email")
        } else {
            fields.string("username")
        };
        Self {
            email,
            password: fields.string("password"),
        }
    }
}

impl FromBody for HelloRequest {
    fn from_fields(fields: &mut BodyFields<'_>) -> Self {
        Self {
            name: fields.string("name"),
        }
    }
}

// -------------------------
// Response mapping helpers
// -------------------------

/// Profiles never expose their password hash or flags.
pub fn profile_to_json(p: &UserProfile) -> serde_json::Value {
    serde_json::json!({
        "id": p.id().to_string(),
        "email": p.email().as_str(),
        "name": p.name(),
    })
}

pub fn feed_item_to_json(item: &ProfileFeedItem) -> serde_json::Value {
    serde_json::json!({
        "id": item.id().to_string(),
        "user_profile": item.user_profile().to_string(),
        "status_text": item.status_text(),
        "created_on": item.created_on().to_rfc3339(),
    })
}
