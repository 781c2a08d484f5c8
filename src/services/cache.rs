//! Short-TTL memoization for read-mostly lookups (tag clouds, owner stats).
//!
//! Not authoritative and never used for version history. Entries expire
//! lazily on read and through a periodic sweep; writers that change a cached
//! value must delete its key themselves.

use dashmap::DashMap;
use std::{
    future::Future,
    sync::{Arc, Weak},
    time::Duration,
};
use tokio::{task::JoinHandle, time::Instant};
use tracing::debug;

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

pub struct EphemeralCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    default_ttl: Duration,
}

impl<V> EphemeralCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    /// Insert or overwrite `key`. `ttl` falls back to the cache default.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let expires_at = Instant::now() + ttl.unwrap_or(self.default_ttl);
        self.entries
            .insert(key.into(), CacheEntry { value, expires_at });
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        {
            let entry = self.entries.get(key)?;
            if entry.expires_at > now {
                return Some(entry.value.clone());
            }
        }
        self.entries.remove_if(key, |_, e| e.expires_at <= now);
        None
    }

    /// Returns true if the key was present (expired or not).
    pub fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Return the cached value, or run `producer` and cache its success.
    ///
    /// Errors are returned as-is and nothing is cached.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        producer: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get(key) {
            debug!("cache hit for {}", key);
            return Ok(hit);
        }
        debug!("cache miss for {}", key);
        let value = producer().await?;
        self.set(key, value.clone(), ttl);
        Ok(value)
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| e.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run `sweep` every `every` until the cache is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = weak.upgrade() else {
                    break;
                };
                let removed = cache.sweep();
                if removed > 0 {
                    debug!("cache sweep removed {} expired entries", removed);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SHORT: Duration = Duration::from_millis(30);

    #[tokio::test]
    async fn set_get_delete() {
        let cache = EphemeralCache::new(Duration::from_secs(60));
        cache.set("a", 1, None);
        assert_eq!(cache.get("a"), Some(1));
        assert!(cache.delete("a"));
        assert_eq!(cache.get("a"), None);
        assert!(!cache.delete("a"));
    }

    #[tokio::test]
    async fn entries_expire_lazily_on_read() {
        let cache = EphemeralCache::new(Duration::from_secs(60));
        cache.set("short", "v", Some(SHORT));
        cache.set("long", "v", None);
        tokio::time::sleep(SHORT * 2).await;

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("short"), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("long"), Some("v"));
    }

    #[tokio::test]
    async fn sweep_removes_only_expired() {
        let cache = EphemeralCache::new(SHORT);
        cache.set("a", 1, None);
        cache.set("b", 2, Some(Duration::from_secs(60)));
        tokio::time::sleep(SHORT * 2).await;

        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.get("b"), Some(2));
    }

    #[tokio::test]
    async fn get_or_compute_memoizes_successes_only() {
        let cache = EphemeralCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        let failed: Result<u32, &str> = cache
            .get_or_compute("k", None, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("boom")
            })
            .await;
        assert!(failed.is_err());

        for _ in 0..3 {
            let v: Result<u32, &str> = cache
                .get_or_compute("k", None, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await;
            assert_eq!(v, Ok(7));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn background_sweeper_evicts() {
        let cache = Arc::new(EphemeralCache::new(SHORT));
        cache.set("a", 1, None);
        let handle = cache.spawn_sweeper(Duration::from_millis(10));
        tokio::time::sleep(SHORT * 4).await;

        assert!(cache.is_empty());
        handle.abort();
    }
}
