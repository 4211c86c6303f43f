use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use profilehub_core::ProfileId;
use profilehub_profiles::ProfileInput;

use crate::app::dto::{self, RawBody, SearchParams};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let items = services
        .list_profiles(ctx.principal(), params.search.as_deref())
        .await?
        .iter()
        .map(dto::profile_to_json)
        .collect::<Vec<_>>();
    Ok(Json(items))
}

pub async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    body: RawBody,
) -> Result<impl IntoResponse, ApiError> {
    let input: ProfileInput = body.decode()?;
    let profile = services.register_profile(ctx.principal(), &input).await?;
    Ok((StatusCode::CREATED, Json(dto::profile_to_json(&profile))))
}

pub async fn retrieve(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ProfileId = id.parse()?;
    let profile = services.get_profile(ctx.principal(), id).await?;
    Ok(Json(dto::profile_to_json(&profile)))
}

pub async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: RawBody,
) -> Result<impl IntoResponse, ApiError> {
    write(services, ctx, id, body, false).await
}

pub async fn partial_update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: RawBody,
) -> Result<impl IntoResponse, ApiError> {
    write(services, ctx, id, body, true).await
}

pub async fn destroy(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ProfileId = id.parse()?;
    services.delete_profile(ctx.principal(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The body is only looked at once the caller is known to own the profile.
async fn write(
    services: Arc<AppServices>,
    ctx: PrincipalContext,
    id: String,
    body: RawBody,
    partial: bool,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id: ProfileId = id.parse()?;
    let target = services
        .authorize_profile_update(ctx.principal(), id, partial)
        .await?;
    let input: ProfileInput = body.decode()?;
    let profile = services.update_profile(target, &input).await?;
    Ok(Json(dto::profile_to_json(&profile)))
}
