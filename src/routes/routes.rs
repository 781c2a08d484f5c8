//! Defines routes for image, metadata and aggregate operations.
//!
//! ## Structure
//! - **Image registry**
//!   - `GET    /images`        - list images (filter, sort, page, pageSize)
//!   - `POST   /images`        - register an image
//!   - `GET    /images/{id}`   - fetch one image
//!   - `PATCH  /images/{id}`   - update title, tags, visibility
//!   - `DELETE /images/{id}`   - delete image and its history
//!
//! - **Metadata**
//!   - `GET  /images/{id}/metadata`          - current or `?version=` bundle
//!   - `PUT  /images/{id}/metadata`          - edit or restore
//!   - `POST /images/{id}/metadata/strip`    - strip
//!   - `GET  /images/{id}/metadata/versions` - history
//!   - `GET  /images/{id}/metadata/export`   - JSON download
//!
//! - **Aggregates**
//!   - `GET /tags`                - tag cloud
//!   - `GET /users/{owner}/stats` - owner totals

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        image_handlers::{
            create_image, delete_image, get_image, list_images, owner_stats, tag_cloud,
            update_image,
        },
        metadata_handlers::{
            export_metadata, get_metadata, list_versions, strip_metadata, update_metadata,
        },
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build the router. Handlers share `AppState`.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Image registry
        .route("/images", get(list_images).post(create_image))
        .route(
            "/images/{id}",
            get(get_image).patch(update_image).delete(delete_image),
        )
        // Metadata
        .route(
            "/images/{id}/metadata",
            get(get_metadata).put(update_metadata),
        )
        .route("/images/{id}/metadata/strip", post(strip_metadata))
        .route("/images/{id}/metadata/versions", get(list_versions))
        .route("/images/{id}/metadata/export", get(export_metadata))
        // Aggregates
        .route("/tags", get(tag_cloud))
        .route("/users/{owner}/stats", get(owner_stats))
}
