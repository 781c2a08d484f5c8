//! Shared router state, built once at startup.

use crate::services::{
    image_service::{ImageService, LookupCaches},
    metadata_service::MetadataService,
};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SqlitePool>,
    pub images: ImageService,
    pub metadata: MetadataService,
    pub caches: Arc<LookupCaches>,
}

impl AppState {
    pub fn new(db: Arc<SqlitePool>, caches: Arc<LookupCaches>) -> Self {
        Self {
            images: ImageService::new(db.clone(), caches.clone()),
            metadata: MetadataService::new(db.clone()),
            caches,
            db,
        }
    }
}
