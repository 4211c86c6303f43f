use axum::{
    extract::Extension,
    http::{header, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::app::errors::ApiError;
use crate::app::routes::RootLinks;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Links to every routed collection, absolute when the request names a host.
pub async fn api_root(Extension(links): Extension<RootLinks>, headers: HeaderMap) -> impl IntoResponse {
    let host = headers.get(header::HOST).and_then(|h| h.to_str().ok());

    let body: serde_json::Map<String, serde_json::Value> = links
        .iter()
        .map(|(name, path)| {
            let url = match host {
                Some(host) => format!("http://{host}{path}"),
                None => path.to_string(),
            };
            (name.to_string(), serde_json::Value::String(url))
        })
        .collect();

    Json(body)
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Known path, method not in its route entry.
pub async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method.to_string())
}
