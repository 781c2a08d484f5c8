//! ImageService - the image registry: create, read, update, delete, listing
//! and the cached aggregate lookups (tag cloud, owner stats).
//!
//! Image bytes are owned by external blob storage; only the record lives here.

use super::{
    access_guard::AccessGuard,
    cache::EphemeralCache,
    error::{Access, ServiceError, ServiceResult},
    metadata_service::MetadataService,
    query_builder::{ImageFilter, ImageQuery, ImageSort},
};
use crate::models::{
    identity::Identity,
    image::{Image, ImagePage, ImagePatch, NewImage, OwnerStats, TagCount, Visibility, normalize_tags},
};
use chrono::Utc;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool, types::Json};
use std::{str::FromStr, sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

const IMAGE_COLUMNS: &str = "id, owner_id, title, tags, format, size_bytes, width, height, \
                             visibility, url, created_at, updated_at";
const MAX_TITLE_LEN: usize = 200;
const MAX_FORMAT_LEN: usize = 16;
const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

/// Fetch an image record by id, without any access check.
pub async fn fetch_image(db: &SqlitePool, id: Uuid) -> Result<Option<Image>, sqlx::Error> {
    sqlx::query_as::<_, Image>(&format!("SELECT {IMAGE_COLUMNS} FROM images WHERE id = ?"))
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Process-scoped caches for read-mostly aggregate lookups.
pub struct LookupCaches {
    pub tags: Arc<EphemeralCache<Vec<TagCount>>>,
    pub stats: Arc<EphemeralCache<OwnerStats>>,
}

impl LookupCaches {
    pub fn new(ttl: Duration) -> Self {
        Self {
            tags: Arc::new(EphemeralCache::new(ttl)),
            stats: Arc::new(EphemeralCache::new(ttl)),
        }
    }

    /// Start one background sweeper per cache. They stop once the caches are dropped.
    pub fn spawn_sweepers(&self, every: Duration) -> Vec<JoinHandle<()>> {
        vec![
            self.tags.spawn_sweeper(every),
            self.stats.spawn_sweeper(every),
        ]
    }

    /// Live entries across both caches, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.tags.len() + self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.stats.is_empty()
    }

    /// Drop every cached value that an image write by `owner` can change.
    pub fn invalidate_owner(&self, owner: &str) {
        self.tags.delete(PUBLIC_TAGS_KEY);
        self.tags.delete(&owner_tags_key(owner));
        self.stats.delete(&stats_key(owner, false));
        self.stats.delete(&stats_key(owner, true));
    }
}

const PUBLIC_TAGS_KEY: &str = "tags:public";

fn owner_tags_key(owner: &str) -> String {
    format!("tags:owner:{}", owner)
}

fn stats_key(owner: &str, own_view: bool) -> String {
    if own_view {
        format!("stats:{}:self", owner)
    } else {
        format!("stats:{}", owner)
    }
}

/// Which images a tag cloud aggregates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TagScope {
    #[default]
    Public,
    Mine,
}

impl FromStr for TagScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(TagScope::Public),
            "mine" => Ok(TagScope::Mine),
            other => Err(format!("unknown tag scope `{}`", other)),
        }
    }
}

/// Validated listing parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListImagesParams {
    pub filter: ImageFilter,
    pub sort: ImageSort,
    pub page: u32,
    pub page_size: u32,
}

impl ListImagesParams {
    /// Parse raw query values. Unknown filter / sort names are rejected.
    pub fn parse(
        filter: Option<&str>,
        sort: Option<&str>,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> ServiceResult<Self> {
        let filter = filter
            .map(ImageFilter::from_str)
            .transpose()
            .map_err(ServiceError::Validation)?
            .unwrap_or_default();
        let sort = sort
            .map(ImageSort::from_str)
            .transpose()
            .map_err(ServiceError::Validation)?
            .unwrap_or_default();
        Ok(Self {
            filter,
            sort,
            page: page.unwrap_or(1).max(1),
            page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        })
    }
}

#[derive(FromRow)]
struct TagRow {
    tag: String,
    count: i64,
}

#[derive(Clone)]
pub struct ImageService {
    db: Arc<SqlitePool>,
    metadata: MetadataService,
    caches: Arc<LookupCaches>,
}

impl ImageService {
    pub fn new(db: Arc<SqlitePool>, caches: Arc<LookupCaches>) -> Self {
        let metadata = MetadataService::new(db.clone());
        Self {
            db,
            metadata,
            caches,
        }
    }

    /// Register an image and write its `initial` metadata version.
    ///
    /// The record and its initial version commit together.
    pub async fn create_image(
        &self,
        identity: Option<&Identity>,
        new: NewImage,
    ) -> ServiceResult<Image> {
        let owner = identity.ok_or(ServiceError::NotAuthorized(Access::Write))?;
        let title = validate_title(&new.title)?;
        let format = new.format.trim().trim_start_matches('.').to_ascii_lowercase();
        if format.is_empty() || format.len() > MAX_FORMAT_LEN {
            return Err(ServiceError::validation("format is required"));
        }
        if new.size_bytes < 0 || new.width < 0 || new.height < 0 {
            return Err(ServiceError::validation(
                "size and dimensions must not be negative",
            ));
        }
        let bundle = MetadataService::prepare_initial(new.raw_metadata.as_ref())?;

        let now = Utc::now();
        let mut tx = self.db.begin().await?;
        let image = sqlx::query_as::<_, Image>(&format!(
            "INSERT INTO images (
                id, owner_id, title, tags, format, size_bytes, width, height,
                visibility, url, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {IMAGE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&owner.id)
        .bind(title)
        .bind(Json(normalize_tags(&new.tags)))
        .bind(&format)
        .bind(new.size_bytes)
        .bind(new.width)
        .bind(new.height)
        .bind(new.visibility.unwrap_or_default())
        .bind(&new.url)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;
        self.metadata.record_initial(&mut tx, &image, bundle).await?;
        tx.commit().await?;

        self.caches.invalidate_owner(&image.owner_id);
        info!("registered image {} for {}", image.id, image.owner_id);
        Ok(image)
    }

    pub async fn get_image(&self, id: Uuid, identity: Option<&Identity>) -> ServiceResult<Image> {
        let image = fetch_image(&self.db, id).await?;
        AccessGuard::ensure(identity, image, id, Access::Read)
    }

    /// Update descriptive attributes. The owner never changes.
    pub async fn update_image(
        &self,
        id: Uuid,
        identity: Option<&Identity>,
        patch: ImagePatch,
    ) -> ServiceResult<Image> {
        let image = AccessGuard::ensure(identity, fetch_image(&self.db, id).await?, id, Access::Write)?;

        let title = match &patch.title {
            Some(title) => validate_title(title)?.to_string(),
            None => image.title.clone(),
        };
        let tags = match &patch.tags {
            Some(tags) => normalize_tags(tags),
            None => image.tags.clone(),
        };
        let visibility = patch.visibility.unwrap_or(image.visibility);

        let updated = sqlx::query_as::<_, Image>(&format!(
            "UPDATE images SET title = ?, tags = ?, visibility = ?, updated_at = ?
             WHERE id = ?
             RETURNING {IMAGE_COLUMNS}"
        ))
        .bind(&title)
        .bind(Json(&tags))
        .bind(visibility)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(ServiceError::ImageNotFound(id))?;

        self.caches.invalidate_owner(&updated.owner_id);
        Ok(updated)
    }

    /// Delete the record; its version log goes with it.
    pub async fn delete_image(&self, id: Uuid, identity: Option<&Identity>) -> ServiceResult<()> {
        let image = AccessGuard::ensure(identity, fetch_image(&self.db, id).await?, id, Access::Write)?;

        let result = sqlx::query("DELETE FROM images WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::ImageNotFound(id));
        }

        self.caches.invalidate_owner(&image.owner_id);
        info!("deleted image {}", id);
        Ok(())
    }

    /// One page of images visible to `identity`.
    pub async fn list_images(
        &self,
        identity: Option<&Identity>,
        params: ListImagesParams,
    ) -> ServiceResult<ImagePage> {
        let query = ImageQuery::for_listing(identity, params.filter, params.sort);

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM images WHERE ");
        query.push_where(&mut count);
        let total: i64 = count.build_query_scalar().fetch_one(&*self.db).await?;

        let offset = i64::from(params.page - 1) * i64::from(params.page_size);
        let mut select =
            QueryBuilder::<Sqlite>::new(format!("SELECT {IMAGE_COLUMNS} FROM images WHERE "));
        query.push_where(&mut select);
        query.push_order_by(&mut select);
        select.push(" LIMIT ");
        select.push_bind(i64::from(params.page_size));
        select.push(" OFFSET ");
        select.push_bind(offset);
        let images: Vec<Image> = select.build_query_as().fetch_all(&*self.db).await?;

        let total_pages = u32::try_from(total.max(0))
            .unwrap_or(u32::MAX)
            .div_ceil(params.page_size);

        Ok(ImagePage {
            images,
            total,
            page: params.page,
            page_size: params.page_size,
            total_pages,
        })
    }

    /// Tag usage counts, most used first.
    pub async fn tag_cloud(
        &self,
        identity: Option<&Identity>,
        scope: TagScope,
    ) -> ServiceResult<Vec<TagCount>> {
        match scope {
            TagScope::Public => {
                self.caches
                    .tags
                    .get_or_compute(PUBLIC_TAGS_KEY, None, || {
                        self.aggregate_tags("images.visibility = ?", Visibility::Public.as_str())
                    })
                    .await
            }
            TagScope::Mine => {
                let who = identity.ok_or(ServiceError::NotAuthorized(Access::Read))?;
                self.caches
                    .tags
                    .get_or_compute(&owner_tags_key(&who.id), None, || {
                        self.aggregate_tags("images.owner_id = ?", &who.id)
                    })
                    .await
            }
        }
    }

    /// Image totals for `owner`, counting only what the caller may read.
    pub async fn owner_stats(
        &self,
        identity: Option<&Identity>,
        owner: &str,
    ) -> ServiceResult<OwnerStats> {
        let own_view = identity.is_some_and(|who| who.id == owner);
        self.caches
            .stats
            .get_or_compute(&stats_key(owner, own_view), None, || async move {
                let mut builder = QueryBuilder::<Sqlite>::new(
                    "SELECT COUNT(*), COALESCE(SUM(visibility = 'public'), 0), \
                     COALESCE(SUM(size_bytes), 0) FROM images WHERE owner_id = ",
                );
                builder.push_bind(owner);
                if !own_view {
                    builder.push(" AND visibility = 'public'");
                }
                let (count, public, bytes): (i64, i64, i64) =
                    builder.build_query_as().fetch_one(&*self.db).await?;
                Ok::<_, ServiceError>(OwnerStats {
                    owner: owner.to_string(),
                    image_count: count.max(0) as u64,
                    public_count: public.max(0) as u64,
                    total_bytes: bytes,
                })
            })
            .await
    }

    async fn aggregate_tags(&self, condition: &str, value: &str) -> ServiceResult<Vec<TagCount>> {
        let rows = sqlx::query_as::<_, TagRow>(&format!(
            "SELECT t.value AS tag, COUNT(*) AS count
             FROM images, json_each(images.tags) AS t
             WHERE {condition}
             GROUP BY t.value
             ORDER BY count DESC, tag ASC"
        ))
        .bind(value)
        .fetch_all(&*self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| TagCount {
                tag: row.tag,
                count: row.count.max(0) as u64,
            })
            .collect())
    }
}

fn validate_title(title: &str) -> ServiceResult<&str> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::validation("title is required"));
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(ServiceError::validation(format!(
            "title exceeds {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use crate::models::version::ChangeType;
    use crate::services::{error::ErrorKind, version_store::VersionStore};
    use serde_json::json;

    async fn service() -> ImageService {
        let pool = Arc::new(memory_pool().await);
        ImageService::new(pool, Arc::new(LookupCaches::new(Duration::from_secs(60))))
    }

    fn new_image(title: &str, format: &str, size: i64, visibility: Visibility) -> NewImage {
        NewImage {
            title: title.into(),
            tags: vec!["Nature".into(), "sky".into()],
            format: format.into(),
            size_bytes: size,
            width: 100,
            height: 50,
            visibility: Some(visibility),
            ..Default::default()
        }
    }

    fn log(svc: &ImageService) -> VersionStore {
        VersionStore::new(svc.db.clone())
    }

    async fn image_rows(svc: &ImageService) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM images")
            .fetch_one(&*svc.db)
            .await
            .unwrap()
    }

    fn ids(page: &ImagePage) -> Vec<Uuid> {
        page.images.iter().map(|i| i.id).collect()
    }

    #[tokio::test]
    async fn create_writes_initial_version_from_raw_metadata() {
        let svc = service().await;
        let u1 = Identity::new("u1");
        let mut new = new_image("  Sunset ", ".JPG", 10, Visibility::Private);
        new.raw_metadata = json!({ "Make": "Canon", "Vendor": "x" }).as_object().cloned();

        let image = svc.create_image(Some(&u1), new).await.unwrap();
        assert_eq!(image.title, "Sunset");
        assert_eq!(image.format, "jpg");
        assert_eq!(image.owner_id, "u1");
        assert_eq!(image.tags.iter().cloned().collect::<Vec<_>>(), vec!["nature", "sky"]);

        let initial = log(&svc).latest(image.id).await.unwrap().unwrap();
        assert_eq!(initial.change_type, ChangeType::Initial);
        assert_eq!(initial.author, None);
        assert_eq!(initial.metadata.basic["title"], json!("Sunset"));
        assert_eq!(initial.metadata.exif.unwrap()["make"], json!("Canon"));
        assert_eq!(initial.metadata.custom.unwrap()["Vendor"], json!("x"));
    }

    #[tokio::test]
    async fn create_rejects_invalid_raw_metadata_without_writing() {
        let svc = service().await;
        let u1 = Identity::new("u1");
        let long_key = "k".repeat(500);
        let cases = [
            json!({ "": 1 }),
            json!({ long_key.as_str(): "v" }),
            json!({ "Blob": "x".repeat(300 * 1024) }),
        ];

        for raw in cases {
            let mut new = new_image("t", "png", 1, Visibility::Public);
            new.raw_metadata = raw.as_object().cloned();
            let err = svc.create_image(Some(&u1), new).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert_eq!(image_rows(&svc).await, 0);
    }

    #[tokio::test]
    async fn anonymous_cannot_create_and_bad_input_is_rejected() {
        let svc = service().await;
        let err = svc
            .create_image(None, new_image("t", "png", 1, Visibility::Public))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAuthorized);

        let u1 = Identity::new("u1");
        let err = svc
            .create_image(Some(&u1), new_image(" ", "png", 1, Visibility::Public))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = svc
            .create_image(Some(&u1), new_image("t", "png", -1, Visibility::Public))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn update_keeps_owner_and_requires_ownership() {
        let svc = service().await;
        let u1 = Identity::new("u1");
        let image = svc
            .create_image(Some(&u1), new_image("t", "png", 1, Visibility::Private))
            .await
            .unwrap();

        let patch = ImagePatch {
            visibility: Some(Visibility::Public),
            ..Default::default()
        };
        let err = svc
            .update_image(image.id, Some(&Identity::new("u2")), patch.clone())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAuthorized);

        let updated = svc.update_image(image.id, Some(&u1), patch).await.unwrap();
        assert_eq!(updated.visibility, Visibility::Public);
        assert_eq!(updated.owner_id, "u1");
        assert_eq!(updated.title, "t");
        assert!(updated.updated_at >= image.updated_at);
        assert!(svc.get_image(image.id, None).await.is_ok());
    }

    #[tokio::test]
    async fn delete_removes_image_and_history() {
        let svc = service().await;
        let u1 = Identity::new("u1");
        let image = svc
            .create_image(Some(&u1), new_image("t", "png", 1, Visibility::Public))
            .await
            .unwrap();

        let err = svc.delete_image(image.id, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAuthorized);

        svc.delete_image(image.id, Some(&u1)).await.unwrap();
        assert_eq!(log(&svc).count(image.id).await.unwrap(), 0);
        let err = svc.get_image(image.id, Some(&u1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn listing_never_leaks_private_images() {
        let svc = service().await;
        let u1 = Identity::new("u1");
        let u2 = Identity::new("u2");
        let mine_private = svc
            .create_image(Some(&u1), new_image("b", "jpg", 30, Visibility::Private))
            .await
            .unwrap();
        let mine_public = svc
            .create_image(Some(&u1), new_image("a", "svg", 10, Visibility::Public))
            .await
            .unwrap();
        let theirs_private = svc
            .create_image(Some(&u2), new_image("c", "png", 20, Visibility::Private))
            .await
            .unwrap();
        let theirs_public = svc
            .create_image(Some(&u2), new_image("d", "png", 40, Visibility::Public))
            .await
            .unwrap();

        let params = |filter: &str, sort: &str| {
            ListImagesParams::parse(Some(filter), Some(sort), None, None).unwrap()
        };

        let anon = svc.list_images(None, params("private", "a-z")).await.unwrap();
        assert_eq!(ids(&anon), vec![mine_public.id, theirs_public.id]);
        assert_eq!(anon.total, 2);

        let all = svc.list_images(Some(&u1), params("all", "largest")).await.unwrap();
        assert_eq!(ids(&all), vec![theirs_public.id, mine_private.id, mine_public.id]);
        assert!(!ids(&all).contains(&theirs_private.id));

        let private = svc.list_images(Some(&u1), params("private", "newest")).await.unwrap();
        assert_eq!(ids(&private), vec![mine_private.id]);

        let recent = svc.list_images(Some(&u1), params("recent", "oldest")).await.unwrap();
        assert_eq!(ids(&recent), vec![mine_private.id, mine_public.id]);

        let vectors = svc.list_images(Some(&u2), params("vectors", "newest")).await.unwrap();
        assert_eq!(ids(&vectors), vec![mine_public.id]);

        let photos = svc.list_images(Some(&u2), params("photos", "smallest")).await.unwrap();
        assert_eq!(ids(&photos), vec![theirs_private.id, theirs_public.id]);
    }

    #[tokio::test]
    async fn listing_pages() {
        let svc = service().await;
        let u1 = Identity::new("u1");
        for i in 0..5 {
            svc.create_image(Some(&u1), new_image(&format!("img{i}"), "png", i, Visibility::Public))
                .await
                .unwrap();
        }

        let page = svc
            .list_images(None, ListImagesParams::parse(None, Some("a-z"), Some(2), Some(2)).unwrap())
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        let titles: Vec<_> = page.images.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["img2", "img3"]);
    }

    #[test]
    fn list_params_validate_names_and_clamp_sizes() {
        let err = ListImagesParams::parse(Some("everything"), None, None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = ListImagesParams::parse(None, Some("random"), None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let p = ListImagesParams::parse(None, None, Some(0), Some(10_000)).unwrap();
        assert_eq!((p.page, p.page_size), (1, MAX_PAGE_SIZE));
        assert_eq!(p.filter, ImageFilter::All);
        assert_eq!(p.sort, ImageSort::Newest);
    }

    #[tokio::test]
    async fn invalidate_owner_clears_only_that_owners_keys() {
        let caches = LookupCaches::new(Duration::from_secs(60));
        assert!(caches.is_empty());
        caches.tags.set(PUBLIC_TAGS_KEY, Vec::new(), None);
        caches.tags.set(owner_tags_key("u1"), Vec::new(), None);
        caches.tags.set(owner_tags_key("u2"), Vec::new(), None);
        caches.stats.set(stats_key("u1", true), OwnerStats::default(), None);
        caches.stats.set(stats_key("u2", false), OwnerStats::default(), None);

        caches.invalidate_owner("u1");
        assert_eq!(caches.len(), 2);
        assert!(caches.tags.get(&owner_tags_key("u2")).is_some());
        assert!(caches.stats.get(&stats_key("u2", false)).is_some());

        caches.invalidate_owner("u2");
        assert!(caches.is_empty());
    }

    #[tokio::test]
    async fn tag_cloud_is_cached_until_a_write_invalidates_it() {
        let svc = service().await;
        let u1 = Identity::new("u1");
        let image = svc
            .create_image(Some(&u1), new_image("t", "png", 1, Visibility::Public))
            .await
            .unwrap();
        let mut hidden = new_image("h", "png", 1, Visibility::Private);
        hidden.tags = vec!["secret".into()];
        svc.create_image(Some(&u1), hidden).await.unwrap();

        let cloud = svc.tag_cloud(None, TagScope::Public).await.unwrap();
        assert_eq!(
            cloud,
            vec![
                TagCount { tag: "nature".into(), count: 1 },
                TagCount { tag: "sky".into(), count: 1 },
            ]
        );

        // A write that bypasses the service is not seen until invalidated.
        sqlx::query("UPDATE images SET tags = '[\"other\"]' WHERE id = ?")
            .bind(image.id)
            .execute(&*svc.db)
            .await
            .unwrap();
        assert_eq!(svc.tag_cloud(None, TagScope::Public).await.unwrap(), cloud);

        svc.update_image(
            image.id,
            Some(&u1),
            ImagePatch {
                tags: Some(vec!["sky".into(), "sea".into()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let cloud = svc.tag_cloud(None, TagScope::Public).await.unwrap();
        assert_eq!(
            cloud,
            vec![
                TagCount { tag: "sea".into(), count: 1 },
                TagCount { tag: "sky".into(), count: 1 },
            ]
        );

        let mine = svc.tag_cloud(Some(&u1), TagScope::Mine).await.unwrap();
        assert!(mine.iter().any(|t| t.tag == "secret"));
        let err = svc.tag_cloud(None, TagScope::Mine).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAuthorized);
    }

    #[tokio::test]
    async fn owner_stats_hide_private_images_from_others() {
        let svc = service().await;
        let u1 = Identity::new("u1");
        svc.create_image(Some(&u1), new_image("a", "png", 10, Visibility::Public))
            .await
            .unwrap();
        svc.create_image(Some(&u1), new_image("b", "png", 5, Visibility::Private))
            .await
            .unwrap();

        let public_view = svc.owner_stats(None, "u1").await.unwrap();
        assert_eq!((public_view.image_count, public_view.total_bytes), (1, 10));

        let own_view = svc.owner_stats(Some(&u1), "u1").await.unwrap();
        assert_eq!(
            own_view,
            OwnerStats {
                owner: "u1".into(),
                image_count: 2,
                public_count: 1,
                total_bytes: 15,
            }
        );

        svc.create_image(Some(&u1), new_image("c", "png", 1, Visibility::Public))
            .await
            .unwrap();
        assert_eq!(svc.owner_stats(None, "u1").await.unwrap().image_count, 2);
    }
}
