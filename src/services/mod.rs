//! Domain services. Handlers only ever talk to `ImageService` and
//! `MetadataService`; both enforce access through `AccessGuard`.

pub mod access_guard;
pub mod cache;
pub mod error;
pub mod image_service;
pub mod metadata_service;
pub mod normalize;
pub mod query_builder;
pub mod version_store;
