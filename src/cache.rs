//! The response cache facade (spec §4.B): named stores keyed by request,
//! with `open`/`match`/`put`/`delete`.
//!
//! Grounded in `http-cache`'s `CacheManager` trait and its `MokaManager` /
//! `CACacheManager` backends (`managers/moka.rs`, `managers/cacache.rs`):
//! one trait, swappable storage.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{CachedResponse, FetchRequest};

/// `matchOptions` from spec §4.B: an enumerated option bag, all booleans
/// defaulting to `false`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    /// Ignore the query string when matching.
    pub ignore_search: bool,
    /// Ignore the request method when matching.
    pub ignore_method: bool,
    /// Ignore `Vary`-based header comparison when matching.
    pub ignore_vary: bool,
}

/// An opaque handle to an opened named cache, analogous to the browser
/// `Cache` object returned by `caches.open(name)`.
#[derive(Debug, Clone)]
pub struct CacheHandle {
    name: String,
}

impl CacheHandle {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The cache name this handle was opened with.
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct StoredEntry {
    request_fingerprint: String,
    response: CachedResponse,
}

/// The response cache facade. Implementations must treat `put` as a full
/// replacement of any existing entry under the same fingerprint, and must
/// not assume `match_request` is ever called concurrently with a `put` in a
/// way that requires locking beyond what the backend already provides
/// (spec §5: "the platform response cache is internally concurrent-safe").
#[async_trait]
pub trait ResponseCache: Send + Sync + 'static {
    /// Opens (creating if necessary) the named cache.
    async fn open(&self, name: &str) -> Result<CacheHandle>;

    /// Looks up `request` in `handle`, honoring `options`.
    async fn match_request(
        &self,
        handle: &CacheHandle,
        request: &FetchRequest,
        options: MatchOptions,
    ) -> Result<Option<CachedResponse>>;

    /// Stores `response` under `request`'s fingerprint, replacing any
    /// existing entry.
    async fn put(
        &self,
        handle: &CacheHandle,
        request: &FetchRequest,
        response: CachedResponse,
    ) -> Result<()>;

    /// Removes the entry for `request`, if any. Returns whether an entry
    /// was actually removed.
    async fn delete(
        &self,
        handle: &CacheHandle,
        request: &FetchRequest,
    ) -> Result<bool>;
}

fn matches(
    stored: &FetchRequest,
    candidate: &FetchRequest,
    options: MatchOptions,
) -> bool {
    if !options.ignore_method && stored.method != candidate.method {
        return false;
    }
    if options.ignore_search {
        if stored.url.path() != candidate.url.path()
            || stored.url.host_str() != candidate.url.host_str()
        {
            return false;
        }
    } else if stored.url != candidate.url {
        return false;
    }
    // `ignore_vary` governs whether header-dependent variants of the same
    // URL are distinguished; this in-memory/disk facade only ever stores
    // one entry per fingerprint, so there is nothing further to compare.
    let _ = options.ignore_vary;
    true
}

#[cfg(feature = "cache-moka")]
pub mod moka_cache {
    //! An in-memory [`ResponseCache`] backed by `moka::future::Cache`,
    //! grounded in `http-cache`'s `MokaManager`. One sub-cache is lazily
    //! created per opened name, since a process may host several Request
    //! Wrappers with distinct cache names (spec §3, "Cache name").

    use std::collections::HashMap;
    use std::sync::Arc;

    use async_lock::RwLock;
    use async_trait::async_trait;
    use moka::future::Cache;

    use super::{matches, CacheHandle, MatchOptions, ResponseCache, StoredEntry};
    use crate::error::{CacheError, Result};
    use crate::types::{CachedResponse, FetchRequest};

    /// Default per-name capacity, mirroring `MokaManager::default`'s `Cache::new(42)`.
    const DEFAULT_CAPACITY: u64 = 512;

    /// In-memory response cache. Cheap to clone; all state lives behind an
    /// `Arc`.
    #[derive(Clone)]
    pub struct MokaResponseCache {
        capacity: u64,
        caches: Arc<RwLock<HashMap<String, Cache<String, Arc<StoredEntry>>>>>,
    }

    impl std::fmt::Debug for MokaResponseCache {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("MokaResponseCache").finish_non_exhaustive()
        }
    }

    impl Default for MokaResponseCache {
        fn default() -> Self {
            Self::with_capacity(DEFAULT_CAPACITY)
        }
    }

    impl MokaResponseCache {
        /// Creates a cache where each opened name gets its own backing
        /// store of the given capacity.
        pub fn with_capacity(capacity: u64) -> Self {
            Self { capacity, caches: Arc::new(RwLock::new(HashMap::new())) }
        }

        async fn get_or_create(
            &self,
            name: &str,
        ) -> Cache<String, Arc<StoredEntry>> {
            if let Some(existing) = self.caches.read().await.get(name) {
                return existing.clone();
            }
            let mut guard = self.caches.write().await;
            guard
                .entry(name.to_string())
                .or_insert_with(|| Cache::new(self.capacity))
                .clone()
        }
    }

    #[async_trait]
    impl ResponseCache for MokaResponseCache {
        async fn open(&self, name: &str) -> Result<CacheHandle> {
            self.get_or_create(name).await;
            Ok(CacheHandle::new(name))
        }

        async fn match_request(
            &self,
            handle: &CacheHandle,
            request: &FetchRequest,
            options: MatchOptions,
        ) -> Result<Option<CachedResponse>> {
            let cache = self.get_or_create(handle.name()).await;
            let key = request.fingerprint();
            if let Some(entry) = cache.get(&key).await {
                return Ok(Some(entry.response.clone()));
            }
            // `ignore_search`/`ignore_method` mean the exact-fingerprint key
            // may miss while a looser match would hit; scan the name's
            // entries in that case. Entry counts for a single service
            // worker's cache are small enough that this linear scan is the
            // right tradeoff against a secondary index we'd otherwise have
            // to keep in sync on every put/delete.
            if options.ignore_search || options.ignore_method {
                for (_, entry) in cache.iter() {
                    if matches(
                        &fingerprint_to_request(&entry.request_fingerprint)?,
                        request,
                        options,
                    ) {
                        return Ok(Some(entry.response.clone()));
                    }
                }
            }
            Ok(None)
        }

        async fn put(
            &self,
            handle: &CacheHandle,
            request: &FetchRequest,
            response: CachedResponse,
        ) -> Result<()> {
            let cache = self.get_or_create(handle.name()).await;
            let key = request.fingerprint();
            let entry = StoredEntry {
                request_fingerprint: key.clone(),
                response,
            };
            cache.insert(key, Arc::new(entry)).await;
            cache.run_pending_tasks().await;
            Ok(())
        }

        async fn delete(
            &self,
            handle: &CacheHandle,
            request: &FetchRequest,
        ) -> Result<bool> {
            let cache = self.get_or_create(handle.name()).await;
            let key = request.fingerprint();
            let existed = cache.contains_key(&key);
            cache.invalidate(&key).await;
            cache.run_pending_tasks().await;
            Ok(existed)
        }
    }

    /// Fingerprints are `"{method}:{url}"`; re-derive just enough of a
    /// `FetchRequest` from one to drive the loose-match scan above.
    fn fingerprint_to_request(
        fingerprint: &str,
    ) -> Result<FetchRequest> {
        let (method, url) = fingerprint
            .split_once(':')
            .ok_or(CacheError::InvalidResponseForCaching)?;
        Ok(FetchRequest {
            method: method
                .parse()
                .map_err(|_| CacheError::InvalidResponseForCaching)?,
            url: url::Url::parse(url)?,
            headers: http::HeaderMap::new(),
        })
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::types::ResponseType;
        use url::Url;

        fn response(body: &str, url: &Url) -> CachedResponse {
            CachedResponse {
                status: 200,
                headers: http::HeaderMap::new(),
                body: bytes::Bytes::from(body.to_string()),
                url: url.clone(),
                response_type: ResponseType::Basic,
            }
        }

        #[tokio::test]
        async fn exact_match_requires_identical_url() {
            let cache = MokaResponseCache::default();
            let handle = cache.open("t").await.unwrap();
            let stored = FetchRequest::get(Url::parse("https://e.com/a?x=1").unwrap());
            cache.put(&handle, &stored, response("v", &stored.url)).await.unwrap();

            let different_query =
                FetchRequest::get(Url::parse("https://e.com/a?x=2").unwrap());
            assert!(cache
                .match_request(&handle, &different_query, MatchOptions::default())
                .await
                .unwrap()
                .is_none());
        }

        #[tokio::test]
        async fn ignore_search_matches_regardless_of_query_string() {
            let cache = MokaResponseCache::default();
            let handle = cache.open("t").await.unwrap();
            let stored = FetchRequest::get(Url::parse("https://e.com/a?x=1").unwrap());
            cache.put(&handle, &stored, response("v", &stored.url)).await.unwrap();

            let different_query =
                FetchRequest::get(Url::parse("https://e.com/a?x=2").unwrap());
            let options = MatchOptions { ignore_search: true, ..Default::default() };
            let got = cache
                .match_request(&handle, &different_query, options)
                .await
                .unwrap();
            assert_eq!(got.unwrap().body, "v");
        }

        #[tokio::test]
        async fn names_partition_entries() {
            let cache = MokaResponseCache::default();
            let request = FetchRequest::get(Url::parse("https://e.com/a").unwrap());
            let a = cache.open("a").await.unwrap();
            let b = cache.open("b").await.unwrap();
            cache.put(&a, &request, response("for-a", &request.url)).await.unwrap();

            assert!(cache
                .match_request(&b, &request, MatchOptions::default())
                .await
                .unwrap()
                .is_none());
        }

        #[tokio::test]
        async fn delete_reports_whether_an_entry_existed() {
            let cache = MokaResponseCache::default();
            let handle = cache.open("t").await.unwrap();
            let request = FetchRequest::get(Url::parse("https://e.com/a").unwrap());

            assert!(!cache.delete(&handle, &request).await.unwrap());
            cache.put(&handle, &request, response("v", &request.url)).await.unwrap();
            assert!(cache.delete(&handle, &request).await.unwrap());
        }
    }
}

#[cfg(feature = "cache-moka")]
pub use moka_cache::MokaResponseCache;

#[cfg(feature = "cache-disk")]
pub mod disk_cache {
    //! A content-addressed, disk-backed [`ResponseCache`] using `cacache`,
    //! grounded in `http-cache`'s `CACacheManager`. Serializes entries with
    //! `postcard`, the serialization format `http-cache` itself migrated
    //! to after deprecating `bincode` (RUSTSEC-2025-0141).

    use std::path::PathBuf;

    use async_trait::async_trait;

    use super::{CacheHandle, MatchOptions, ResponseCache, StoredEntry};
    use crate::error::Result;
    use crate::types::{CachedResponse, FetchRequest};

    /// Disk-backed response cache rooted at a single directory; cache names
    /// are namespaced by prefixing the `cacache` key.
    #[derive(Debug, Clone)]
    pub struct CacacheResponseCache {
        root: PathBuf,
    }

    impl CacacheResponseCache {
        /// Creates a cache rooted at `root`. The directory is created
        /// lazily by `cacache` on first write.
        pub fn new(root: PathBuf) -> Self {
            Self { root }
        }

        fn key_for(&self, name: &str, request: &FetchRequest) -> String {
            format!("{name}:{}", request.fingerprint())
        }
    }

    #[async_trait]
    impl ResponseCache for CacacheResponseCache {
        async fn open(&self, name: &str) -> Result<CacheHandle> {
            Ok(CacheHandle::new(name))
        }

        async fn match_request(
            &self,
            handle: &CacheHandle,
            request: &FetchRequest,
            _options: MatchOptions,
        ) -> Result<Option<CachedResponse>> {
            let key = self.key_for(handle.name(), request);
            match cacache::read(&self.root, &key).await {
                Ok(bytes) => {
                    let entry: StoredEntry = postcard::from_bytes(&bytes)?;
                    Ok(Some(entry.response))
                }
                Err(cacache::Error::EntryNotFound(..)) => Ok(None),
                Err(e) => Err(e.into()),
            }
        }

        async fn put(
            &self,
            handle: &CacheHandle,
            request: &FetchRequest,
            response: CachedResponse,
        ) -> Result<()> {
            let key = self.key_for(handle.name(), request);
            let entry = StoredEntry {
                request_fingerprint: request.fingerprint(),
                response,
            };
            let bytes = postcard::to_allocvec(&entry)?;
            cacache::write(&self.root, &key, bytes).await?;
            Ok(())
        }

        async fn delete(
            &self,
            handle: &CacheHandle,
            request: &FetchRequest,
        ) -> Result<bool> {
            let key = self.key_for(handle.name(), request);
            let existed = cacache::metadata(&self.root, &key).await?.is_some();
            cacache::remove(&self.root, &key).await?;
            Ok(existed)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::types::ResponseType;
        use url::Url;

        fn response(body: &str) -> CachedResponse {
            CachedResponse {
                status: 200,
                headers: http::HeaderMap::new(),
                body: bytes::Bytes::from(body.to_string()),
                url: Url::parse("https://example.com/a").unwrap(),
                response_type: ResponseType::Basic,
            }
        }

        #[tokio::test]
        async fn put_then_match_round_trips_through_postcard() {
            let dir = tempfile::tempdir().unwrap();
            let cache = CacacheResponseCache::new(dir.path().to_path_buf());
            let handle = cache.open("disk").await.unwrap();
            let request =
                FetchRequest::get(Url::parse("https://example.com/a").unwrap());

            cache.put(&handle, &request, response("on-disk")).await.unwrap();
            let got = cache.match_request(&handle, &request, MatchOptions::default()).await.unwrap();
            assert_eq!(got.unwrap().body, "on-disk");
        }

        #[tokio::test]
        async fn delete_reports_whether_an_entry_existed() {
            let dir = tempfile::tempdir().unwrap();
            let cache = CacacheResponseCache::new(dir.path().to_path_buf());
            let handle = cache.open("disk").await.unwrap();
            let request =
                FetchRequest::get(Url::parse("https://example.com/missing").unwrap());

            assert!(!cache.delete(&handle, &request).await.unwrap());
            cache.put(&handle, &request, response("x")).await.unwrap();
            assert!(cache.delete(&handle, &request).await.unwrap());
            assert!(cache
                .match_request(&handle, &request, MatchOptions::default())
                .await
                .unwrap()
                .is_none());
        }

        #[tokio::test]
        async fn cache_names_are_namespaced_on_disk() {
            let dir = tempfile::tempdir().unwrap();
            let cache = CacacheResponseCache::new(dir.path().to_path_buf());
            let request =
                FetchRequest::get(Url::parse("https://example.com/a").unwrap());

            let a = cache.open("a").await.unwrap();
            let b = cache.open("b").await.unwrap();
            cache.put(&a, &request, response("for-a")).await.unwrap();

            assert!(cache
                .match_request(&b, &request, MatchOptions::default())
                .await
                .unwrap()
                .is_none());
        }
    }
}

#[cfg(feature = "cache-disk")]
pub use disk_cache::CacacheResponseCache;
