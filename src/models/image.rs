//! Represents a hosted image record. The bytes live in external blob storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{collections::BTreeSet, fmt, str::FromStr};
use uuid::Uuid;

/// Read gate for an image. Private images are visible to their owner only.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => Err(format!("unknown visibility `{}`", other)),
        }
    }
}

/// A single hosted image.
///
/// `owner_id` is fixed at creation; no update path rewrites it.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Identity of the uploading user.
    pub owner_id: String,

    /// Human readable title.
    pub title: String,

    /// Lower-cased, deduplicated tag set.
    #[sqlx(json)]
    pub tags: BTreeSet<String>,

    /// Lower-cased file format / extension (e.g. `jpg`, `svg`).
    pub format: String,

    /// Size of the stored bytes.
    pub size_bytes: i64,

    /// Pixel dimensions (0 when unknown, e.g. for vectors).
    pub width: i64,
    pub height: i64,

    pub visibility: Visibility,

    /// CDN URL owned by the blob storage collaborator.
    pub url: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when registering a new image.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewImage {
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub format: String,
    #[serde(default)]
    pub size_bytes: i64,
    #[serde(default)]
    pub width: i64,
    #[serde(default)]
    pub height: i64,
    pub visibility: Option<Visibility>,
    pub url: Option<String>,
    /// Provider-specific fields returned by the raw extraction collaborator.
    pub raw_metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Partial update of an image's descriptive attributes.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImagePatch {
    pub title: Option<String>,
    pub tags: Option<Vec<String>>,
    pub visibility: Option<Visibility>,
}

/// One page of an image listing.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ImagePage {
    pub images: Vec<Image>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

/// Aggregated tag usage.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TagCount {
    pub tag: String,
    pub count: u64,
}

/// Per-owner image totals, as visible to the requesting caller.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct OwnerStats {
    pub owner: String,
    pub image_count: u64,
    pub public_count: u64,
    pub total_bytes: i64,
}

/// Normalize a user supplied tag list: trim, lower-case, drop empties, dedupe.
pub fn normalize_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}
