//! Core data models for the image metadata service.
//!
//! Images and metadata versions map to SQLite tables via `sqlx::FromRow`
//! and serialize as JSON via `serde`. Metadata bundles are stored as JSON
//! text inside the version rows.

pub mod bundle;
pub mod identity;
pub mod image;
pub mod version;
