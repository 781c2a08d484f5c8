//! HTTP handlers for metadata reads, writes and history.
//! All access decisions are made by `MetadataService`.

use super::{
    extract::{JsonBody, PathParam, QueryParams},
    identity::Caller,
};
use crate::{
    errors::AppError,
    models::version::{MetadataVersion, VersionSummary},
    services::metadata_service::{MetadataUpdate, MetadataView},
    state::AppState,
};
use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use uuid::Uuid;

/// `?version=<uuid>` selector for reads and exports.
#[derive(Debug, Deserialize)]
pub struct VersionQuery {
    pub version: Option<Uuid>,
}

/// `?expectedParent=<uuid>` precondition for strip.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StripQuery {
    pub expected_parent: Option<Uuid>,
}

/// GET `/images/{id}/metadata`
pub async fn get_metadata(
    State(state): State<AppState>,
    caller: Caller,
    PathParam(id): PathParam<Uuid>,
    QueryParams(q): QueryParams<VersionQuery>,
) -> Result<Json<MetadataView>, AppError> {
    let view = state
        .metadata
        .get_metadata(id, caller.identity(), q.version)
        .await?;
    Ok(Json(view))
}

/// PUT `/images/{id}/metadata` - edit, or restore with `restoreFrom`.
pub async fn update_metadata(
    State(state): State<AppState>,
    caller: Caller,
    PathParam(id): PathParam<Uuid>,
    JsonBody(update): JsonBody<MetadataUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let version = state
        .metadata
        .update_metadata(id, caller.identity(), update)
        .await?;
    Ok((StatusCode::CREATED, Json(version)))
}

/// POST `/images/{id}/metadata/strip`
pub async fn strip_metadata(
    State(state): State<AppState>,
    caller: Caller,
    PathParam(id): PathParam<Uuid>,
    QueryParams(q): QueryParams<StripQuery>,
) -> Result<(StatusCode, Json<MetadataVersion>), AppError> {
    let version = state
        .metadata
        .strip_metadata(id, caller.identity(), q.expected_parent)
        .await?;
    Ok((StatusCode::CREATED, Json(version)))
}

/// GET `/images/{id}/metadata/versions`
pub async fn list_versions(
    State(state): State<AppState>,
    caller: Caller,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<Vec<VersionSummary>>, AppError> {
    let versions = state.metadata.get_versions(id, caller.identity()).await?;
    Ok(Json(versions))
}

/// GET `/images/{id}/metadata/export` - JSON download.
pub async fn export_metadata(
    State(state): State<AppState>,
    caller: Caller,
    PathParam(id): PathParam<Uuid>,
    QueryParams(q): QueryParams<VersionQuery>,
) -> Result<Response, AppError> {
    let export = state
        .metadata
        .export_metadata(id, caller.identity(), q.version)
        .await?;

    let disposition = format!("attachment; filename=\"{}\"", export.filename);
    let mut response = Response::new(Body::from(export.body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .map_err(|e| AppError::internal(format!("invalid header: {}", e)))?,
    );
    Ok(response)
}
