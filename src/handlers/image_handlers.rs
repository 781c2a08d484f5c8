//! HTTP handlers for the image registry, listings and cached aggregates.

use super::{
    extract::{JsonBody, PathParam, QueryParams},
    identity::Caller,
};
use crate::{
    errors::AppError,
    models::image::{Image, ImagePage, ImagePatch, NewImage, OwnerStats, TagCount},
    services::image_service::{ListImagesParams, TagScope},
    state::AppState,
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

/// Query params accepted by the image listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListImagesQuery {
    pub filter: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct TagsQuery {
    pub scope: Option<String>,
}

/// GET `/images` - supports ?filter=&sort=&page=&pageSize=
pub async fn list_images(
    State(state): State<AppState>,
    caller: Caller,
    QueryParams(q): QueryParams<ListImagesQuery>,
) -> Result<Json<ImagePage>, AppError> {
    let params = ListImagesParams::parse(
        q.filter.as_deref(),
        q.sort.as_deref(),
        q.page,
        q.page_size,
    )?;
    let page = state.images.list_images(caller.identity(), params).await?;
    Ok(Json(page))
}

/// POST `/images` - register an uploaded image.
pub async fn create_image(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(new): JsonBody<NewImage>,
) -> Result<(StatusCode, Json<Image>), AppError> {
    let image = state.images.create_image(caller.identity(), new).await?;
    Ok((StatusCode::CREATED, Json(image)))
}

/// GET `/images/{id}`
pub async fn get_image(
    State(state): State<AppState>,
    caller: Caller,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<Image>, AppError> {
    let image = state.images.get_image(id, caller.identity()).await?;
    Ok(Json(image))
}

/// PATCH `/images/{id}`
pub async fn update_image(
    State(state): State<AppState>,
    caller: Caller,
    PathParam(id): PathParam<Uuid>,
    JsonBody(patch): JsonBody<ImagePatch>,
) -> Result<Json<Image>, AppError> {
    let image = state.images.update_image(id, caller.identity(), patch).await?;
    Ok(Json(image))
}

/// DELETE `/images/{id}` - removes the record and its metadata history.
pub async fn delete_image(
    State(state): State<AppState>,
    caller: Caller,
    PathParam(id): PathParam<Uuid>,
) -> Result<StatusCode, AppError> {
    state.images.delete_image(id, caller.identity()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET `/tags` - ?scope=public|mine
pub async fn tag_cloud(
    State(state): State<AppState>,
    caller: Caller,
    QueryParams(q): QueryParams<TagsQuery>,
) -> Result<Json<Vec<TagCount>>, AppError> {
    let scope = match q.scope.as_deref() {
        Some(raw) => raw.parse::<TagScope>().map_err(AppError::bad_request)?,
        None => TagScope::default(),
    };
    let tags = state.images.tag_cloud(caller.identity(), scope).await?;
    Ok(Json(tags))
}

/// GET `/users/{owner}/stats`
pub async fn owner_stats(
    State(state): State<AppState>,
    caller: Caller,
    PathParam(owner): PathParam<String>,
) -> Result<Json<OwnerStats>, AppError> {
    let stats = state.images.owner_stats(caller.identity(), &owner).await?;
    Ok(Json(stats))
}
