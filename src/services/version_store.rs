//! Append-only, per-image metadata version log backed by SQLite.
//!
//! Each version is its own row, written atomically by a single INSERT. The
//! current version is derived (greatest `created_at`, then greatest `seq`);
//! there is no mutable "current" pointer.

use crate::models::{
    bundle::MetadataBundle,
    version::{ChangeType, MetadataVersion},
};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool, types::Json};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const VERSION_COLUMNS: &str =
    "id, image_id, created_at, author, change_type, metadata, description";

/// Fields of a version about to be appended.
#[derive(Debug, Clone)]
pub struct NewVersion<'a> {
    pub bundle: &'a MetadataBundle,
    pub change_type: ChangeType,
    pub author: Option<&'a str>,
    pub description: Option<&'a str>,
}

/// Result of a conditional append.
#[derive(Debug, Clone, PartialEq)]
pub enum AppendOutcome {
    /// The version was written and is now current.
    Appended(MetadataVersion),
    /// The current version was not the expected parent; nothing was written.
    Conflict { current: Option<Uuid> },
}

#[derive(Clone)]
pub struct VersionStore {
    db: Arc<SqlitePool>,
}

impl VersionStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Append a new version with `created_at = now()`.
    ///
    /// `created_at` is clamped to the current latest so the log never goes
    /// backwards when the wall clock steps back.
    pub async fn append(
        &self,
        image_id: Uuid,
        version: NewVersion<'_>,
    ) -> Result<MetadataVersion, sqlx::Error> {
        let mut conn = self.db.acquire().await?;
        Self::append_in(&mut conn, image_id, version).await
    }

    /// `append` on a caller-held connection, so it can join a wider transaction.
    pub async fn append_in(
        conn: &mut SqliteConnection,
        image_id: Uuid,
        version: NewVersion<'_>,
    ) -> Result<MetadataVersion, sqlx::Error> {
        let latest = latest_in(conn, image_id).await?;
        insert_in(conn, image_id, latest.as_ref(), version).await
    }

    /// Append only if the current version is `expected_parent`.
    ///
    /// The check and the insert share one transaction.
    pub async fn append_after(
        &self,
        image_id: Uuid,
        expected_parent: Uuid,
        version: NewVersion<'_>,
    ) -> Result<AppendOutcome, sqlx::Error> {
        let mut tx = self.db.begin().await?;
        let latest = latest_in(&mut tx, image_id).await?;
        let current = latest.as_ref().map(|v| v.id);
        if current != Some(expected_parent) {
            tx.rollback().await?;
            return Ok(AppendOutcome::Conflict { current });
        }
        let appended = insert_in(&mut tx, image_id, latest.as_ref(), version).await?;
        tx.commit().await?;
        Ok(AppendOutcome::Appended(appended))
    }

    /// The current version of an image, if its log is non-empty.
    pub async fn latest(&self, image_id: Uuid) -> Result<Option<MetadataVersion>, sqlx::Error> {
        let mut conn = self.db.acquire().await?;
        latest_in(&mut conn, image_id).await
    }

    /// A specific version, scoped to its image.
    pub async fn get(
        &self,
        image_id: Uuid,
        version_id: Uuid,
    ) -> Result<Option<MetadataVersion>, sqlx::Error> {
        sqlx::query_as::<_, MetadataVersion>(&format!(
            "SELECT {VERSION_COLUMNS} FROM metadata_versions WHERE image_id = ? AND id = ?"
        ))
        .bind(image_id)
        .bind(version_id)
        .fetch_optional(&*self.db)
        .await
    }

    /// The full history, newest first, as of the moment of the call.
    pub async fn list(&self, image_id: Uuid) -> Result<Vec<MetadataVersion>, sqlx::Error> {
        sqlx::query_as::<_, MetadataVersion>(&format!(
            "SELECT {VERSION_COLUMNS} FROM metadata_versions
             WHERE image_id = ?
             ORDER BY created_at DESC, seq DESC"
        ))
        .bind(image_id)
        .fetch_all(&*self.db)
        .await
    }

    pub async fn count(&self, image_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM metadata_versions WHERE image_id = ?")
            .bind(image_id)
            .fetch_one(&*self.db)
            .await
    }
}

async fn latest_in(
    conn: &mut SqliteConnection,
    image_id: Uuid,
) -> Result<Option<MetadataVersion>, sqlx::Error> {
    sqlx::query_as::<_, MetadataVersion>(&format!(
        "SELECT {VERSION_COLUMNS} FROM metadata_versions
         WHERE image_id = ?
         ORDER BY created_at DESC, seq DESC
         LIMIT 1"
    ))
    .bind(image_id)
    .fetch_optional(&mut *conn)
    .await
}

async fn insert_in(
    conn: &mut SqliteConnection,
    image_id: Uuid,
    latest: Option<&MetadataVersion>,
    version: NewVersion<'_>,
) -> Result<MetadataVersion, sqlx::Error> {
    let now = Utc::now();
    let created_at = match latest {
        Some(prev) if prev.created_at > now => prev.created_at,
        _ => now,
    };

    let appended = sqlx::query_as::<_, MetadataVersion>(&format!(
        "INSERT INTO metadata_versions (
            id, image_id, created_at, author, change_type, metadata, description
         ) VALUES (?, ?, ?, ?, ?, ?, ?)
         RETURNING {VERSION_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(image_id)
    .bind(created_at)
    .bind(version.author)
    .bind(version.change_type)
    .bind(Json(version.bundle))
    .bind(version.description)
    .fetch_one(&mut *conn)
    .await?;

    info!(
        "appended {} version {} to image {}",
        appended.change_type, appended.id, image_id
    );
    Ok(appended)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use serde_json::json;

    async fn store_with_image() -> (VersionStore, Uuid) {
        let pool = memory_pool().await;
        let image_id = Uuid::new_v4();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO images (id, owner_id, title, format, created_at, updated_at)
             VALUES (?, 'u1', 't', 'jpg', ?, ?)",
        )
        .bind(image_id)
        .bind(now)
        .bind(now)
        .execute(&pool)
        .await
        .unwrap();
        (VersionStore::new(Arc::new(pool)), image_id)
    }

    fn titled(title: &str) -> MetadataBundle {
        let mut bundle = MetadataBundle::default();
        bundle.basic.insert("title".into(), json!(title));
        bundle
    }

    fn edit(bundle: &MetadataBundle) -> NewVersion<'_> {
        NewVersion {
            bundle,
            change_type: ChangeType::Edit,
            author: Some("u1"),
            description: None,
        }
    }

    #[tokio::test]
    async fn empty_log_has_no_latest() {
        let (store, image_id) = store_with_image().await;
        assert!(store.latest(image_id).await.unwrap().is_none());
        assert!(store.list(image_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn latest_is_last_appended_even_within_one_tick() {
        let (store, image_id) = store_with_image().await;
        let mut last = None;
        for i in 0..20 {
            last = Some(store.append(image_id, edit(&titled(&i.to_string()))).await.unwrap());
        }
        let latest = store.latest(image_id).await.unwrap().unwrap();
        assert_eq!(Some(latest.clone()), last);
        assert_eq!(latest.metadata, titled("19"));
    }

    #[tokio::test]
    async fn clock_step_back_is_clamped_and_ties_follow_insertion_order() {
        let (store, image_id) = store_with_image().await;
        let future = Utc::now() + chrono::Duration::hours(1);
        let ahead = titled("ahead");
        sqlx::query(
            "INSERT INTO metadata_versions (id, image_id, created_at, author, change_type, metadata)
             VALUES (?, ?, ?, 'u1', 'edit', ?)",
        )
        .bind(Uuid::new_v4())
        .bind(image_id)
        .bind(future)
        .bind(Json(&ahead))
        .execute(&*store.db)
        .await
        .unwrap();

        let first = store.append(image_id, edit(&titled("a"))).await.unwrap();
        let second = store.append(image_id, edit(&titled("b"))).await.unwrap();
        assert_eq!(first.created_at, future);
        assert_eq!(second.created_at, future);

        assert_eq!(store.latest(image_id).await.unwrap(), Some(second.clone()));
        let titles: Vec<_> = store
            .list(image_id)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.metadata)
            .collect();
        assert_eq!(titles, vec![titled("b"), titled("a"), ahead]);
    }

    #[tokio::test]
    async fn list_is_newest_first_and_non_decreasing() {
        let (store, image_id) = store_with_image().await;
        let a = store.append(image_id, edit(&titled("a"))).await.unwrap();
        let b = store.append(image_id, edit(&titled("b"))).await.unwrap();
        let c = store.append(image_id, edit(&titled("c"))).await.unwrap();

        let ids: Vec<_> = store.list(image_id).await.unwrap().iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![c.id, b.id, a.id]);
        assert!(a.created_at <= b.created_at && b.created_at <= c.created_at);
        assert_eq!(store.count(image_id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn get_is_scoped_to_image() {
        let (store, image_id) = store_with_image().await;
        let v = store.append(image_id, edit(&titled("a"))).await.unwrap();

        assert_eq!(store.get(image_id, v.id).await.unwrap(), Some(v.clone()));
        assert!(store.get(Uuid::new_v4(), v.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn conditional_append_rejects_stale_parent() {
        let (store, image_id) = store_with_image().await;
        let first = store.append(image_id, edit(&titled("a"))).await.unwrap();
        let second = store.append(image_id, edit(&titled("b"))).await.unwrap();

        let outcome = store
            .append_after(image_id, first.id, edit(&titled("stale")))
            .await
            .unwrap();
        assert_eq!(outcome, AppendOutcome::Conflict { current: Some(second.id) });
        assert_eq!(store.count(image_id).await.unwrap(), 2);

        let outcome = store
            .append_after(image_id, second.id, edit(&titled("fresh")))
            .await
            .unwrap();
        assert!(matches!(outcome, AppendOutcome::Appended(ref v) if v.metadata == titled("fresh")));
    }

    #[tokio::test]
    async fn versions_cascade_with_image_delete() {
        let (store, image_id) = store_with_image().await;
        store.append(image_id, edit(&titled("a"))).await.unwrap();

        sqlx::query("DELETE FROM images WHERE id = ?")
            .bind(image_id)
            .execute(&*store.db)
            .await
            .unwrap();
        assert_eq!(store.count(image_id).await.unwrap(), 0);
    }
}
