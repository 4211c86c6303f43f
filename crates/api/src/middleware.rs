use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use profilehub_auth::{AuthToken, Principal};

use crate::app::errors::{ApiError, INVALID_TOKEN};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

const NO_CREDENTIALS: &str = "Invalid token header. No credentials provided.";
const SPACES_IN_TOKEN: &str = "Invalid token header. Token string should not contain spaces.";

/// Schemes accepted in the `Authorization` header.
const SCHEMES: [&str; 2] = ["token", "bearer"];

#[derive(Clone)]
pub struct AuthState {
    pub services: Arc<AppServices>,
}

/// Resolve the request's principal from its token.
///
/// Requests without token credentials continue as anonymous; whether that is
/// enough is up to each resource's policies. A token that is presented but
/// does not resolve is rejected here, on every route.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = match extract_token(req.headers())? {
        Some(token) => state.services.authenticate(&token).await?,
        None => Principal::Anonymous,
    };

    req.extensions_mut().insert(PrincipalContext::new(principal));

    Ok(next.run(req).await)
}

/// `Authorization: Token <key>` (or `Bearer <key>`).
///
/// Other schemes are ignored so they can be handled elsewhere.
fn extract_token(headers: &HeaderMap) -> Result<Option<AuthToken>, ApiError> {
    let Some(header) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let header = header
        .to_str()
        .map_err(|_| ApiError::NotAuthenticated(INVALID_TOKEN))?;

    let mut parts = header.split_whitespace();
    let Some(scheme) = parts.next() else {
        return Ok(None);
    };
    if !SCHEMES.iter().any(|s| scheme.eq_ignore_ascii_case(s)) {
        return Ok(None);
    }

    let key = parts.next().ok_or(ApiError::NotAuthenticated(NO_CREDENTIALS))?;
    if parts.next().is_some() {
        return Err(ApiError::NotAuthenticated(SPACES_IN_TOKEN));
    }

    Ok(Some(AuthToken::new(key)))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn missing_header_is_anonymous() {
        assert!(extract_token(&HeaderMap::new()).unwrap().is_none());
    }

    #[test]
    fn accepts_token_and_bearer_schemes() {
        let token = extract_token(&headers("Token abc123")).unwrap().unwrap();
        assert_eq!(token.as_str(), "abc123");

        let token = extract_token(&headers("bearer abc123")).unwrap().unwrap();
        assert_eq!(token.as_str(), "abc123");
    }

    #[test]
    fn other_schemes_are_ignored() {
        assert!(extract_token(&headers("Basic dXNlcjpwdw==")).unwrap().is_none());
    }

    #[test]
    fn malformed_token_headers_are_rejected() {
        assert!(matches!(
            extract_token(&headers("Token")),
            Err(ApiError::NotAuthenticated(NO_CREDENTIALS))
        ));
        assert!(matches!(
            extract_token(&headers("Token abc def")),
            Err(ApiError::NotAuthenticated(SPACES_IN_TOKEN))
        ));
    }
}
