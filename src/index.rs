//! The timestamp index (spec §4.C): one object store per cache name,
//! primary key `url`, secondary index `timestamp` (non-unique, ascending
//! scan). Kept in sync with the response cache by the expiration plugin,
//! not by this module.
//!
//! `http-cache`'s own manager backends (`managers/moka.rs`) show the
//! per-backend-struct-implementing-a-trait shape this module follows, but
//! none of them expose an ordered cursor the way spec §4.C requires, so the
//! ordering here is hand-rolled the way `http-cache` hand-rolls
//! `managers/streaming_cache.rs`'s on-disk layout when no existing crate
//! fits.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_lock::RwLock;
use async_trait::async_trait;

use crate::error::Result;

/// A single timestamp record: `{ url, timestamp }` from spec §3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampRecord {
    /// Primary key.
    pub url: String,
    /// Milliseconds since epoch; the secondary index is ordered by this.
    pub timestamp_ms: i64,
}

/// The timestamp index's storage contract. Every method is its own
/// transaction: two sequential scans (as `find_extra_entries` needs — a
/// `count` then a cursor walk) take two separate calls, never sharing
/// transaction state, per spec §4.C and the cursor-portability note in §9.
#[async_trait]
pub trait TimestampStore: Send + Sync + 'static {
    /// Upserts a record, replacing any existing record for the same URL
    /// under the same cache name.
    async fn put(&self, cache_name: &str, record: TimestampRecord) -> Result<()>;

    /// Deletes the record for `url` under `cache_name`, if any.
    async fn delete_by_url(&self, cache_name: &str, url: &str) -> Result<()>;

    /// All records under `cache_name`, ascending by timestamp.
    async fn iterate_by_timestamp(
        &self,
        cache_name: &str,
    ) -> Result<Vec<TimestampRecord>>;

    /// The number of records under `cache_name`.
    async fn count(&self, cache_name: &str) -> Result<usize>;
}

/// One logical object store per cache name: a primary-key map from `url`
/// to timestamp, and a `BTreeMap` ordered by `(timestamp, url)` standing in
/// for the `timestamp` secondary index.
#[derive(Default)]
struct Store {
    by_url: HashMap<String, i64>,
    by_timestamp: BTreeMap<(i64, String), ()>,
}

impl Store {
    fn upsert(&mut self, url: &str, timestamp_ms: i64) {
        if let Some(old) = self.by_url.insert(url.to_string(), timestamp_ms) {
            self.by_timestamp.remove(&(old, url.to_string()));
        }
        self.by_timestamp.insert((timestamp_ms, url.to_string()), ());
    }

    fn remove(&mut self, url: &str) {
        if let Some(old) = self.by_url.remove(url) {
            self.by_timestamp.remove(&(old, url.to_string()));
        }
    }
}

/// An in-memory [`TimestampStore`]. The default and only backend this crate
/// ships: spec §1 treats the underlying local key/value database as an
/// external collaborator (a real service worker would back this with
/// IndexedDB), so this struct is the embedded "one object store per cache
/// name" implementation a native test harness, or a non-browser embedder,
/// can use directly.
pub struct InMemoryTimestampStore {
    stores: RwLock<HashMap<String, Arc<RwLock<Store>>>>,
}

impl std::fmt::Debug for InMemoryTimestampStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTimestampStore").finish_non_exhaustive()
    }
}

impl Default for InMemoryTimestampStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTimestampStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self { stores: RwLock::new(HashMap::new()) }
    }

    async fn store_for(&self, cache_name: &str) -> Arc<RwLock<Store>> {
        if let Some(existing) = self.stores.read().await.get(cache_name) {
            return existing.clone();
        }
        let mut guard = self.stores.write().await;
        guard
            .entry(cache_name.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(Store::default())))
            .clone()
    }
}

#[async_trait]
impl TimestampStore for InMemoryTimestampStore {
    async fn put(&self, cache_name: &str, record: TimestampRecord) -> Result<()> {
        let store = self.store_for(cache_name).await;
        store.write().await.upsert(&record.url, record.timestamp_ms);
        Ok(())
    }

    async fn delete_by_url(&self, cache_name: &str, url: &str) -> Result<()> {
        let store = self.store_for(cache_name).await;
        store.write().await.remove(url);
        Ok(())
    }

    async fn iterate_by_timestamp(
        &self,
        cache_name: &str,
    ) -> Result<Vec<TimestampRecord>> {
        let store = self.store_for(cache_name).await;
        let guard = store.read().await;
        Ok(guard
            .by_timestamp
            .keys()
            .map(|(timestamp_ms, url)| TimestampRecord {
                url: url.clone(),
                timestamp_ms: *timestamp_ms,
            })
            .collect())
    }

    async fn count(&self, cache_name: &str) -> Result<usize> {
        let store = self.store_for(cache_name).await;
        Ok(store.read().await.by_url.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_replaces_previous_timestamp_ordering() {
        let store = InMemoryTimestampStore::new();
        store
            .put("c", TimestampRecord { url: "/a".into(), timestamp_ms: 10 })
            .await
            .unwrap();
        store
            .put("c", TimestampRecord { url: "/a".into(), timestamp_ms: 20 })
            .await
            .unwrap();
        let records = store.iterate_by_timestamp("c").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].timestamp_ms, 20);
    }

    #[tokio::test]
    async fn iterate_is_ascending_by_timestamp() {
        let store = InMemoryTimestampStore::new();
        store
            .put("c", TimestampRecord { url: "/b".into(), timestamp_ms: 20 })
            .await
            .unwrap();
        store
            .put("c", TimestampRecord { url: "/a".into(), timestamp_ms: 10 })
            .await
            .unwrap();
        let records = store.iterate_by_timestamp("c").await.unwrap();
        let urls: Vec<_> = records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["/a", "/b"]);
    }

    #[tokio::test]
    async fn delete_removes_from_both_indices() {
        let store = InMemoryTimestampStore::new();
        store
            .put("c", TimestampRecord { url: "/a".into(), timestamp_ms: 10 })
            .await
            .unwrap();
        store.delete_by_url("c", "/a").await.unwrap();
        assert_eq!(store.count("c").await.unwrap(), 0);
        assert!(store.iterate_by_timestamp("c").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cache_names_are_isolated() {
        let store = InMemoryTimestampStore::new();
        store
            .put("a", TimestampRecord { url: "/x".into(), timestamp_ms: 1 })
            .await
            .unwrap();
        assert_eq!(store.count("a").await.unwrap(), 1);
        assert_eq!(store.count("b").await.unwrap(), 0);
    }
}
