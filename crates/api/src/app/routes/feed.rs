use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use profilehub_core::FeedItemId;
use profilehub_feed::FeedItemInput;

use crate::app::dto::{self, RawBody};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
) -> Result<impl IntoResponse, ApiError> {
    let items = services
        .list_feed(ctx.principal())
        .await?
        .iter()
        .map(dto::feed_item_to_json)
        .collect::<Vec<_>>();
    Ok(Json(items))
}

/// Any `user_profile` in the body is ignored; the caller owns the item.
pub async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    body: RawBody,
) -> Result<impl IntoResponse, ApiError> {
    let author = services.authorize_feed_post(ctx.principal())?;
    let input: FeedItemInput = body.decode()?;
    let item = services.post_feed_item(author, &input).await?;
    Ok((StatusCode::CREATED, Json(dto::feed_item_to_json(&item))))
}

pub async fn retrieve(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(ctx, &id)?;
    let item = services.get_feed_item(ctx.principal(), id).await?;
    Ok(Json(dto::feed_item_to_json(&item)))
}

pub async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: RawBody,
) -> Result<impl IntoResponse, ApiError> {
    revise(services, ctx, id, body, false).await
}

pub async fn partial_update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: RawBody,
) -> Result<impl IntoResponse, ApiError> {
    revise(services, ctx, id, body, true).await
}

pub async fn destroy(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(ctx, &id)?;
    services.delete_feed_item(ctx.principal(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn revise(
    services: Arc<AppServices>,
    ctx: PrincipalContext,
    id: String,
    body: RawBody,
    partial: bool,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_id(ctx, &id)?;
    let target = services
        .authorize_feed_update(ctx.principal(), id, partial)
        .await?;
    let input: FeedItemInput = body.decode()?;
    let item = services.update_feed_item(target, &input).await?;
    Ok(Json(dto::feed_item_to_json(&item)))
}

/// Anonymous callers learn they must authenticate before learning whether
/// the id is well formed.
fn parse_id(ctx: PrincipalContext, raw: &str) -> Result<FeedItemId, ApiError> {
    if !ctx.principal().is_authenticated() {
        return Err(profilehub_auth::AuthzError::NotAuthenticated.into());
    }
    Ok(raw.parse()?)
}
