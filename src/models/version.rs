//! Represents one immutable snapshot in an image's metadata history.

use super::bundle::MetadataBundle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// The operation that produced a version.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ChangeType {
    Initial,
    Edit,
    Strip,
    Restore,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Initial => "initial",
            ChangeType::Edit => "edit",
            ChangeType::Strip => "strip",
            ChangeType::Restore => "restore",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A full copy (never a diff) of an image's metadata at one point in time.
///
/// Rows are insert-only. The current version of an image is the row with the
/// greatest `created_at`, ties broken by insertion order.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetadataVersion {
    pub id: Uuid,

    /// Owning image. Rows are removed only when the image is deleted.
    pub image_id: Uuid,

    pub created_at: DateTime<Utc>,

    /// Absent for system-generated initial versions.
    pub author: Option<String>,

    pub change_type: ChangeType,

    #[sqlx(json)]
    pub metadata: MetadataBundle,

    pub description: Option<String>,
}

/// History entry without the bundle payload.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VersionSummary {
    pub id: Uuid,
    pub image_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub author: Option<String>,
    pub change_type: ChangeType,
    pub description: Option<String>,
}

impl From<&MetadataVersion> for VersionSummary {
    fn from(v: &MetadataVersion) -> Self {
        Self {
            id: v.id,
            image_id: v.image_id,
            created_at: v.created_at,
            author: v.author.clone(),
            change_type: v.change_type,
            description: v.description.clone(),
        }
    }
}
