use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, Json};
use serde_json::json;

use crate::app::dto::{LoginRequest, RawBody};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

/// Exchange `{email, password}` for the profile's token.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: RawBody,
) -> Result<impl IntoResponse, ApiError> {
    let request: LoginRequest = body.decode()?;
    let (email, password) = request.credentials()?;
    let token = services.login(email, password).await?;
    Ok(Json(json!({ "token": token.as_str() })))
}
