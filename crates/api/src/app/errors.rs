use axum::http::{header, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use serde_json::json;
use thiserror::Error;

use profilehub_auth::AuthzError;
use profilehub_core::{DomainError, FieldErrors};
use profilehub_infra::StoreError;

use crate::app::services::ServiceError;

pub const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";
pub const INVALID_TOKEN: &str = "Invalid token.";
pub const INACTIVE_PROFILE: &str = "User inactive or deleted.";
pub const INVALID_CREDENTIALS: &str = "Unable to log in with provided credentials.";
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Every failure a handler can answer with.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Field-level validation failure.
    #[error("invalid input: {0}")]
    Invalid(FieldErrors),

    #[error("{0}")]
    BadRequest(String),

    /// The body could not be parsed at all.
    #[error("malformed request body: {0}")]
    Malformed(String),

    #[error("{0}")]
    NotAuthenticated(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("method {0} not allowed")]
    MethodNotAllowed(String),

    #[error(transparent)]
    Store(StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Invalid(_) | Self::BadRequest(_) | Self::Malformed(_) => StatusCode::BAD_REQUEST,
            Self::NotAuthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn field(field: &str, msg: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, msg);
        Self::Invalid(errors)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        match self {
            Self::Invalid(fields) => (
                status,
                axum::Json(json!({
                    "error": "validation_error",
                    "message": "invalid input",
                    "fields": fields,
                })),
            )
                .into_response(),
            Self::BadRequest(msg) => json_error(status, "validation_error", msg),
            Self::Malformed(msg) => json_error(status, "parse_error", msg),
            Self::NotAuthenticated(msg) => {
                tracing::warn!(reason = msg, "request not authenticated");
                let mut res = json_error(status, "not_authenticated", msg);
                res.headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Token"));
                res
            }
            Self::Forbidden(msg) => {
                tracing::warn!(reason = %msg, "permission denied");
                json_error(status, "forbidden", msg)
            }
            Self::NotFound => json_error(status, "not_found", "Not found."),
            Self::Conflict(msg) => json_error(status, "conflict", msg),
            Self::MethodNotAllowed(method) => json_error(
                status,
                "method_not_allowed",
                format!("Method \"{method}\" not allowed."),
            ),
            Self::Store(err) => {
                tracing::error!(error = %err, "store failure");
                json_error(status, "store_error", "internal store error")
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "internal failure");
                json_error(status, "internal_error", "internal server error")
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidFields(fields) => Self::Invalid(fields),
            DomainError::Validation(msg) => Self::BadRequest(msg),
            // An id that cannot be parsed cannot name a record.
            DomainError::InvalidId(_) | DomainError::NotFound => Self::NotFound,
            DomainError::Conflict(msg) => Self::Conflict(msg),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotAuthenticated => Self::NotAuthenticated(NOT_AUTHENTICATED),
            AuthzError::Forbidden(msg) => Self::Forbidden(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict("email") => {
                Self::field("email", "user profile with this email already exists.")
            }
            StoreError::Conflict(field) => Self::Conflict(format!("{field} already exists")),
            StoreError::NotFound => Self::NotFound,
            err @ StoreError::Backend { .. } => Self::Store(err),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Domain(e) => e.into(),
            ServiceError::Authz(e) => e.into(),
            ServiceError::Store(e) => e.into(),
            ServiceError::InvalidCredentials => Self::field(NON_FIELD_ERRORS, INVALID_CREDENTIALS),
            ServiceError::InvalidToken => Self::NotAuthenticated(INVALID_TOKEN),
            ServiceError::InactiveProfile => Self::NotAuthenticated(INACTIVE_PROFILE),
            ServiceError::Task(msg) => Self::Internal(msg),
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_conflict_becomes_a_field_error() {
        let err = ApiError::from(StoreError::Conflict("email"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let ApiError::Invalid(fields) = err else {
            panic!("expected field errors");
        };
        assert!(fields.get("email").is_some());
    }

    #[test]
    fn malformed_ids_are_not_found() {
        let err = ApiError::from(DomainError::invalid_id("ProfileId: nope"));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn authorization_failures_map_to_401_and_403() {
        assert_eq!(
            ApiError::from(AuthzError::NotAuthenticated).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthzError::Forbidden("no".into())).status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn unauthenticated_responses_carry_the_token_challenge() {
        let res = ApiError::from(ServiceError::InvalidToken).into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.headers()[header::WWW_AUTHENTICATE], "Token");
    }

    #[test]
    fn bad_credentials_are_a_non_field_error() {
        let ApiError::Invalid(fields) = ApiError::from(ServiceError::InvalidCredentials) else {
            panic!("expected field errors");
        };
        assert_eq!(fields.get(NON_FIELD_ERRORS), Some(&[INVALID_CREDENTIALS.to_string()][..]));
    }

    #[test]
    fn backend_failures_are_500() {
        let err = ApiError::from(StoreError::backend("profiles.list", "connection reset"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = ApiError::from(ServiceError::Task("task panicked".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn unsupported_method_is_405() {
        let res = ApiError::MethodNotAllowed("DELETE".into()).into_response();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
