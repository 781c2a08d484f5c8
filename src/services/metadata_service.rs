//! MetadataService - read, edit, strip, restore, export and history for an
//! image's metadata.
//!
//! Every operation resolves the image first and runs it through
//! [`AccessGuard`]. Mutations never touch existing rows: edit, strip and
//! restore each append one new version to the log.

use super::{
    access_guard::AccessGuard,
    error::{Access, ServiceError, ServiceResult},
    image_service::fetch_image,
    normalize,
    version_store::{AppendOutcome, NewVersion, VersionStore},
};
use crate::models::{
    bundle::{Fields, MetadataBundle},
    identity::Identity,
    image::{Image, Visibility},
    version::{ChangeType, MetadataVersion, VersionSummary},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

const MAX_FIELD_NAME_LEN: usize = 128;
const MAX_BUNDLE_BYTES: usize = 256 * 1024;
const MAX_DESCRIPTION_LEN: usize = 1000;

/// `basic` keys that survive a strip.
const PRESERVED_BASIC_FIELDS: [&str; 7] = [
    "format",
    "width",
    "height",
    "size",
    "dimensions",
    "colorSpace",
    "orientation",
];

/// Basic image attributes returned alongside a bundle.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageInfo {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub format: String,
    pub size_bytes: i64,
    pub width: i64,
    pub height: i64,
    pub visibility: Visibility,
    pub url: Option<String>,
}

impl From<&Image> for ImageInfo {
    fn from(image: &Image) -> Self {
        Self {
            id: image.id,
            owner_id: image.owner_id.clone(),
            title: image.title.clone(),
            format: image.format.clone(),
            size_bytes: image.size_bytes,
            width: image.width,
            height: image.height,
            visibility: image.visibility,
            url: image.url.clone(),
        }
    }
}

/// Result of a metadata read.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MetadataView {
    pub image: ImageInfo,
    pub version: VersionSummary,
    /// False when an older version was selected explicitly.
    pub is_current: bool,
    /// Number of versions in the image's history.
    pub version_count: i64,
    pub metadata: MetadataBundle,
}

/// Body of a metadata write. With `restore_from` set, `metadata` is ignored.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct MetadataUpdate {
    pub metadata: Option<MetadataBundle>,
    pub restore_from: Option<Uuid>,
    pub description: Option<String>,
    /// When set, the write only succeeds if this is still the current version.
    pub expected_parent: Option<Uuid>,
}

/// A serialized bundle ready for download.
#[derive(Debug, Clone)]
pub struct MetadataExport {
    pub filename: String,
    pub body: Vec<u8>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    image_id: Uuid,
    version_id: Uuid,
    change_type: ChangeType,
    created_at: DateTime<Utc>,
    exported_at: DateTime<Utc>,
    metadata: &'a MetadataBundle,
}

#[derive(Clone)]
pub struct MetadataService {
    db: Arc<SqlitePool>,
    versions: VersionStore,
}

impl MetadataService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        let versions = VersionStore::new(db.clone());
        Self { db, versions }
    }

    /// Map raw extraction output into the bundle taxonomy.
    pub fn normalize_metadata(raw: &serde_json::Map<String, Value>) -> MetadataBundle {
        normalize::normalize_metadata(raw)
    }

    /// Normalize raw extraction output for a new image and validate it like
    /// an edit, before anything is written.
    pub fn prepare_initial(
        raw: Option<&serde_json::Map<String, Value>>,
    ) -> ServiceResult<MetadataBundle> {
        let bundle = raw.map(Self::normalize_metadata).unwrap_or_default();
        validate_bundle(&bundle)?;
        Ok(bundle)
    }

    /// Append the `initial` version of a just-inserted image on `conn`.
    pub async fn record_initial(
        &self,
        conn: &mut SqliteConnection,
        image: &Image,
        mut bundle: MetadataBundle,
    ) -> ServiceResult<MetadataVersion> {
        merge_image_fields(&mut bundle.basic, image);
        let version = VersionStore::append_in(
            conn,
            image.id,
            NewVersion {
                bundle: &bundle,
                change_type: ChangeType::Initial,
                author: None,
                description: None,
            },
        )
        .await?;
        Ok(version)
    }

    /// Read the current bundle, or a specific historical one.
    ///
    /// Previewing an old version never writes.
    pub async fn get_metadata(
        &self,
        image_id: Uuid,
        identity: Option<&Identity>,
        version_id: Option<Uuid>,
    ) -> ServiceResult<MetadataView> {
        let image = self.resolve(image_id, identity, Access::Read).await?;
        let current = self.current_or_initial(&image).await?;

        let (version, is_current) = match version_id {
            Some(id) if id != current.id => (self.version(&image, id).await?, false),
            _ => (current, true),
        };
        let version_count = self.versions.count(image.id).await?;

        Ok(MetadataView {
            image: ImageInfo::from(&image),
            version: VersionSummary::from(&version),
            is_current,
            version_count,
            metadata: version.metadata,
        })
    }

    /// Append an edit, or a restore when `update.restore_from` is set.
    pub async fn update_metadata(
        &self,
        image_id: Uuid,
        identity: Option<&Identity>,
        update: MetadataUpdate,
    ) -> ServiceResult<MetadataVersion> {
        let image = self.resolve(image_id, identity, Access::Write).await?;
        validate_description(update.description.as_deref())?;

        match update.restore_from {
            Some(source_id) => {
                let source = self.version(&image, source_id).await?;
                let description = update
                    .description
                    .unwrap_or_else(|| format!("restored from version {}", source.id));
                self.append(
                    &image,
                    NewVersion {
                        bundle: &source.metadata,
                        change_type: ChangeType::Restore,
                        author: identity.map(|i| i.id.as_str()),
                        description: Some(description.as_str()),
                    },
                    update.expected_parent,
                )
                .await
            }
            None => {
                let bundle = update
                    .metadata
                    .ok_or_else(|| ServiceError::validation("metadata is required"))?;
                validate_bundle(&bundle)?;
                self.append(
                    &image,
                    NewVersion {
                        bundle: &bundle,
                        change_type: ChangeType::Edit,
                        author: identity.map(|i| i.id.as_str()),
                        description: update.description.as_deref(),
                    },
                    update.expected_parent,
                )
                .await
            }
        }
    }

    /// Append a version with every non-essential category cleared.
    pub async fn strip_metadata(
        &self,
        image_id: Uuid,
        identity: Option<&Identity>,
        expected_parent: Option<Uuid>,
    ) -> ServiceResult<MetadataVersion> {
        let image = self.resolve(image_id, identity, Access::Write).await?;
        let current = match (self.versions.latest(image.id).await?, expected_parent) {
            (Some(latest), _) => latest,
            (None, Some(expected)) => {
                return Err(ServiceError::Conflict {
                    expected,
                    current: None,
                });
            }
            (None, None) => self.current_or_initial(&image).await?,
        };
        let stripped = strip_bundle(&current.metadata, &image);
        debug_assert!(stripped.is_stripped());

        self.append(
            &image,
            NewVersion {
                bundle: &stripped,
                change_type: ChangeType::Strip,
                author: identity.map(|i| i.id.as_str()),
                description: None,
            },
            expected_parent,
        )
        .await
    }

    /// Version history, newest first.
    pub async fn get_versions(
        &self,
        image_id: Uuid,
        identity: Option<&Identity>,
    ) -> ServiceResult<Vec<VersionSummary>> {
        let image = self.resolve(image_id, identity, Access::Read).await?;
        self.current_or_initial(&image).await?;
        let versions = self.versions.list(image.id).await?;
        Ok(versions.iter().map(VersionSummary::from).collect())
    }

    /// Serialize a bundle for download. Appends nothing.
    pub async fn export_metadata(
        &self,
        image_id: Uuid,
        identity: Option<&Identity>,
        version_id: Option<Uuid>,
    ) -> ServiceResult<MetadataExport> {
        let view = self.get_metadata(image_id, identity, version_id).await?;

        let document = ExportDocument {
            image_id: view.image.id,
            version_id: view.version.id,
            change_type: view.version.change_type,
            created_at: view.version.created_at,
            exported_at: Utc::now(),
            metadata: &view.metadata,
        };
        let body = serde_json::to_vec_pretty(&document)?;

        Ok(MetadataExport {
            filename: export_filename(image_id, version_id),
            body,
        })
    }

    async fn resolve(
        &self,
        image_id: Uuid,
        identity: Option<&Identity>,
        access: Access,
    ) -> ServiceResult<Image> {
        let image = fetch_image(&self.db, image_id).await?;
        AccessGuard::ensure(identity, image, image_id, access)
    }

    async fn version(&self, image: &Image, version_id: Uuid) -> ServiceResult<MetadataVersion> {
        self.versions
            .get(image.id, version_id)
            .await?
            .ok_or(ServiceError::VersionNotFound {
                image: image.id,
                version: version_id,
            })
    }

    /// The current version, creating the initial one if the log is empty.
    async fn current_or_initial(&self, image: &Image) -> ServiceResult<MetadataVersion> {
        if let Some(latest) = self.versions.latest(image.id).await? {
            return Ok(latest);
        }
        let bundle = initial_bundle(image);
        let version = self
            .versions
            .append(
                image.id,
                NewVersion {
                    bundle: &bundle,
                    change_type: ChangeType::Initial,
                    author: None,
                    description: None,
                },
            )
            .await?;
        Ok(version)
    }

    async fn append(
        &self,
        image: &Image,
        version: NewVersion<'_>,
        expected_parent: Option<Uuid>,
    ) -> ServiceResult<MetadataVersion> {
        let Some(expected) = expected_parent else {
            return Ok(self.versions.append(image.id, version).await?);
        };
        match self.versions.append_after(image.id, expected, version).await? {
            AppendOutcome::Appended(appended) => Ok(appended),
            AppendOutcome::Conflict { current } => {
                Err(ServiceError::Conflict { expected, current })
            }
        }
    }
}

/// Bundle for a version created from the image record alone.
fn initial_bundle(image: &Image) -> MetadataBundle {
    let mut bundle = MetadataBundle::default();
    merge_image_fields(&mut bundle.basic, image);
    bundle
}

/// Write the image record's descriptive attributes into `basic`.
fn merge_image_fields(basic: &mut Fields, image: &Image) {
    basic.insert("title".into(), json!(image.title));
    basic.insert("format".into(), json!(image.format));
    basic.insert("size".into(), json!(image.size_bytes));
    if image.width > 0 && image.height > 0 {
        basic.insert("width".into(), json!(image.width));
        basic.insert("height".into(), json!(image.height));
    }
}

/// Keep only the preservable `basic` fields; drop every other category.
///
/// Format and known dimensions are backfilled from the image record when the
/// source bundle lacks them.
pub fn strip_bundle(bundle: &MetadataBundle, image: &Image) -> MetadataBundle {
    let mut basic: Fields = bundle
        .basic
        .iter()
        .filter(|(key, _)| PRESERVED_BASIC_FIELDS.contains(&key.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    basic
        .entry("format")
        .or_insert_with(|| json!(image.format));
    if image.width > 0 && image.height > 0 {
        basic.entry("width").or_insert_with(|| json!(image.width));
        basic.entry("height").or_insert_with(|| json!(image.height));
    }

    MetadataBundle {
        basic,
        ..Default::default()
    }
}

/// `metadata_<imageId>[_version_<versionId>].json`
pub fn export_filename(image_id: Uuid, version_id: Option<Uuid>) -> String {
    match version_id {
        Some(version) => format!("metadata_{}_version_{}.json", image_id, version),
        None => format!("metadata_{}.json", image_id),
    }
}

pub(crate) fn validate_bundle(bundle: &MetadataBundle) -> ServiceResult<()> {
    for (category, fields) in bundle.categories() {
        for key in fields.keys() {
            if key.trim().is_empty() {
                return Err(ServiceError::validation(format!(
                    "{} contains an empty field name",
                    category
                )));
            }
            if key.chars().count() > MAX_FIELD_NAME_LEN {
                return Err(ServiceError::validation(format!(
                    "{} field name exceeds {} characters",
                    category, MAX_FIELD_NAME_LEN
                )));
            }
        }
    }

    let size = serde_json::to_vec(bundle)?.len();
    if size > MAX_BUNDLE_BYTES {
        return Err(ServiceError::validation(format!(
            "metadata is {} bytes, limit is {}",
            size, MAX_BUNDLE_BYTES
        )));
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> ServiceResult<()> {
    match description {
        Some(text) if text.chars().count() > MAX_DESCRIPTION_LEN => Err(ServiceError::validation(
            format!("description exceeds {} characters", MAX_DESCRIPTION_LEN),
        )),
        _ => Ok(()),
    }
}
