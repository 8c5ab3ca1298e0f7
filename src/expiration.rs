//! The Expiration Plugin (spec §4.G): LRU + max-age eviction, keeping the
//! timestamp index in sync with the response cache.
//!
//! Grounded directly in spec §4.G's operation list; the "lazily create a
//! sub-store keyed by name, wrap it in a typed struct implementing a shared
//! trait" shape follows `managers/moka.rs`'s `MokaManager`, and
//! `CachedResponse::is_ok`'s role as the default `cacheWillUpdate` policy in
//! `plugin.rs` is the same precedent for `CachedResponse::is_fresh` deciding
//! `cacheWillMatch` here.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use url::Url;

use crate::cache::ResponseCache;
use crate::error::{assert_expiration_bounds, Result};
use crate::index::{TimestampRecord, TimestampStore};
use crate::plugin::{Hook, Plugin};
use crate::types::{CachedResponse, FetchRequest};

fn to_millis(now: SystemTime) -> i64 {
    now.duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Evicts entries by count (`maxEntries`) and/or age (`maxAgeSeconds`),
/// keeping a response cache and a timestamp index consistent.
///
/// Bound to exactly one response cache backend and one timestamp store;
/// `cacheName` is supplied per-call through the `cacheDidUpdate` hook
/// (spec §4.E passes it at call time, not at construction).
pub struct ExpirationPlugin<C: ResponseCache, T: TimestampStore> {
    response_cache: Arc<C>,
    timestamp_store: Arc<T>,
    max_entries: Option<u64>,
    max_age_seconds: Option<u64>,
}

impl<C: ResponseCache, T: TimestampStore> ExpirationPlugin<C, T> {
    /// Builds a plugin bound to `response_cache`/`timestamp_store`. Fails
    /// with `max-entries-or-age-required` if neither bound is given. A
    /// bound of zero is accepted: it means "evict everything on every
    /// write," not a type error.
    pub fn new(
        response_cache: Arc<C>,
        timestamp_store: Arc<T>,
        max_entries: Option<u64>,
        max_age_seconds: Option<u64>,
    ) -> Result<Self> {
        assert_expiration_bounds(max_entries, max_age_seconds)?;
        Ok(Self {
            response_cache,
            timestamp_store,
            max_entries,
            max_age_seconds,
        })
    }

    /// `updateTimestamp`: upserts `{url, timestamp: now}` in the index.
    pub async fn update_timestamp(
        &self,
        cache_name: &str,
        url: &Url,
        now: SystemTime,
    ) -> Result<()> {
        self.timestamp_store
            .put(
                cache_name,
                TimestampRecord { url: url.to_string(), timestamp_ms: to_millis(now) },
            )
            .await
    }

    /// `findOldEntries`: URLs whose timestamp is older than `maxAgeSeconds`,
    /// ascending. Empty when `maxAgeSeconds` is unset.
    pub async fn find_old_entries(
        &self,
        cache_name: &str,
        now: SystemTime,
    ) -> Result<Vec<String>> {
        let Some(max_age_seconds) = self.max_age_seconds else {
            return Ok(Vec::new());
        };
        let threshold = to_millis(now) - (max_age_seconds as i64) * 1000;
        let records = self.timestamp_store.iterate_by_timestamp(cache_name).await?;
        Ok(records
            .into_iter()
            .filter(|r| r.timestamp_ms < threshold)
            .map(|r| r.url)
            .collect())
    }

    /// `findExtraEntries`: the oldest `count - maxEntries` URLs once the
    /// index holds more than `maxEntries` records. The stop condition is
    /// the inverted one from spec §9's Open Question: walk the ascending
    /// cursor while the *remaining* unvisited count is still above
    /// `maxEntries`, not while the collected count is below some target —
    /// equivalent here to taking the first `count - maxEntries` records.
    pub async fn find_extra_entries(&self, cache_name: &str) -> Result<Vec<String>> {
        let Some(max_entries) = self.max_entries else {
            return Ok(Vec::new());
        };
        let max_entries = max_entries as usize;
        let count = self.timestamp_store.count(cache_name).await?;
        if count <= max_entries {
            return Ok(Vec::new());
        }
        let excess = count - max_entries;
        let records = self.timestamp_store.iterate_by_timestamp(cache_name).await?;
        Ok(records.into_iter().take(excess).map(|r| r.url).collect())
    }

    /// `expireEntries`: the de-duplicated union of `findOldEntries` and
    /// `findExtraEntries`, deleted from both stores, then returned.
    pub async fn expire_entries(
        &self,
        cache_name: &str,
        now: SystemTime,
    ) -> Result<Vec<String>> {
        let mut urls = self.find_old_entries(cache_name, now).await?;
        for url in self.find_extra_entries(cache_name).await? {
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        self.delete_from_cache_and_index(cache_name, &urls).await?;
        Ok(urls)
    }

    /// `deleteFromCacheAndIndex`: for each URL, delete the response cache
    /// entry, then the index entry, sequentially. Spec §9 flags the
    /// source's concurrent per-URL delete as not transaction-safe; this
    /// awaits each deletion in turn instead.
    async fn delete_from_cache_and_index(
        &self,
        cache_name: &str,
        urls: &[String],
    ) -> Result<()> {
        if urls.is_empty() {
            return Ok(());
        }
        let handle = self.response_cache.open(cache_name).await?;
        for url in urls {
            let request = FetchRequest::get(Url::parse(url)?);
            self.response_cache.delete(&handle, &request).await?;
            self.timestamp_store.delete_by_url(cache_name, url).await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl<C: ResponseCache, T: TimestampStore> Plugin for ExpirationPlugin<C, T> {
    fn implements(&self, hook: Hook) -> bool {
        matches!(hook, Hook::CacheWillMatch | Hook::CacheDidUpdate)
    }

    async fn cache_will_match(
        &self,
        cached_response: CachedResponse,
    ) -> Option<CachedResponse> {
        let Some(max_age_seconds) = self.max_age_seconds else {
            return Some(cached_response);
        };
        let fresh = cached_response
            .is_fresh(Duration::from_secs(max_age_seconds), SystemTime::now());
        fresh.then_some(cached_response)
    }

    async fn cache_did_update(
        &self,
        cache_name: &str,
        _old_response: Option<&CachedResponse>,
        new_response: &CachedResponse,
    ) {
        let now = SystemTime::now();
        if let Err(err) = self.update_timestamp(cache_name, &new_response.url, now).await {
            log::warn!("expiration plugin: failed to update timestamp for {}: {err}", new_response.url);
            return;
        }
        match self.expire_entries(cache_name, now).await {
            Ok(evicted) if !evicted.is_empty() => {
                log::debug!(
                    "expiration plugin: evicted {} entries from {cache_name}",
                    evicted.len()
                );
            }
            Ok(_) => {}
            Err(err) => {
                log::warn!("expiration plugin: failed to expire entries for {cache_name}: {err}");
            }
        }
    }
}
