//! Demonstration endpoints with no business behavior.

use axum::{extract::Path, response::IntoResponse, Json};
use serde_json::json;

use crate::app::dto::{HelloRequest, RawBody};
use crate::app::errors::ApiError;

const AN_APIVIEW: [&str; 4] = [
    "Uses HTTP methods as function (get,post,patch,put,delete)",
    "Is similar to a traditional Django View",
    "Gives you the most control over application logic",
    "Is mapped manually to URLs",
];

const A_VIEWSET: [&str; 3] = [
    "Uses actions (List, create, retrieve, update, partial_update, destroy)",
    "Automatically maps to URLs using Routers",
    "Provides more functionality with less code",
];

// -------------------------
// /hello-view
// -------------------------

pub async fn view_get() -> impl IntoResponse {
    Json(json!({ "message": "Hello!", "an_apiview": AN_APIVIEW }))
}

pub async fn view_post(body: RawBody) -> Result<impl IntoResponse, ApiError> {
    let name = body.decode::<HelloRequest>()?.name()?;
    Ok(Json(json!({ "message": format!("Hello {name}") })))
}

pub async fn view_put() -> impl IntoResponse {
    Json(json!({ "method": "PUT" }))
}

pub async fn view_patch() -> impl IntoResponse {
    Json(json!({ "method": "PATCH" }))
}

pub async fn view_delete() -> impl IntoResponse {
    Json(json!({ "method": "DELETE" }))
}

// -------------------------
// /hello-viewset/
// -------------------------

pub async fn viewset_list() -> impl IntoResponse {
    Json(json!({ "message": "Hello!", "a_viewset": A_VIEWSET }))
}

pub async fn viewset_create(body: RawBody) -> Result<impl IntoResponse, ApiError> {
    let name = body.decode::<HelloRequest>()?.name()?;
    Ok(Json(json!({ "message": format!("Hello {name}!") })))
}

pub async fn viewset_retrieve(Path(_id): Path<String>) -> impl IntoResponse {
    Json(json!({ "http_method": "GET" }))
}

pub async fn viewset_update(Path(_id): Path<String>) -> impl IntoResponse {
    Json(json!({ "http_method": "PUT" }))
}

pub async fn viewset_partial_update(Path(_id): Path<String>) -> impl IntoResponse {
    Json(json!({ "http_method": "PATCH" }))
}

pub async fn viewset_destroy(Path(_id): Path<String>) -> impl IntoResponse {
    Json(json!({ "http_method": "DELETE" }))
}
