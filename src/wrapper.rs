//! The Request Wrapper (spec §4.E): the object every caching strategy
//! delegates to for network and cache operations, fanning out plugin hooks
//! and enforcing the ordering spec §5 describes.
//!
//! Grounded in `http-cache`'s `HttpCache::run`/`Middleware` orchestration
//! loop (`http-cache/src/lib.rs`) and its async-runtime-agnostic
//! `runtime.rs` helper module — here, that same "keep the fire-and-forget
//! write alive past the caller" concern is handled with `tokio::spawn`.

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::cache::{CacheHandle, MatchOptions, ResponseCache};
use crate::error::{CacheError, Result};
use crate::fetcher::Fetcher;
use crate::plugin::{Plugin, PluginRegistry};
use crate::types::{CachedResponse, FetchRequest};

/// The `"sw-runtime-caching-"` prefix from spec §6.
pub const DEFAULT_CACHE_NAME_PREFIX: &str = "sw-runtime-caching-";

/// Construction options for a [`RequestWrapper`] (spec §4.E).
pub struct RequestWrapperOptions {
    /// Overrides the default cache name. Defaults to
    /// `"sw-runtime-caching-" + scope` when `None`.
    pub cache_name: Option<String>,
    /// Plugins to register, in the order their hooks should run.
    pub plugins: Vec<Arc<dyn Plugin>>,
    /// Default `matchOptions` passed to every `cache.match` call.
    pub match_options: MatchOptions,
}

impl Default for RequestWrapperOptions {
    fn default() -> Self {
        Self {
            cache_name: None,
            plugins: Vec::new(),
            match_options: MatchOptions::default(),
        }
    }
}

/// The default cache name for a worker registered at `scope` (spec §6).
pub fn default_cache_name(scope: &str) -> String {
    format!("{DEFAULT_CACHE_NAME_PREFIX}{scope}")
}

/// Orchestrates fetch and cache operations on behalf of exactly one cache
/// name, for the lifetime of the `RequestWrapper` (spec §3, "A Request
/// Wrapper is created once at worker install/activate time").
pub struct RequestWrapper<C: ResponseCache, F: Fetcher> {
    response_cache: Arc<C>,
    fetcher: Arc<F>,
    registry: Arc<PluginRegistry>,
    cache_name: String,
    match_options: MatchOptions,
    handle: OnceCell<CacheHandle>,
}

impl<C: ResponseCache, F: Fetcher> RequestWrapper<C, F> {
    /// Builds a wrapper bound to `scope` (used only to derive the default
    /// cache name) unless `options.cache_name` overrides it. Fails if the
    /// plugin list violates the single-transform-hook invariant (spec
    /// §4.E).
    pub fn new(
        scope: &str,
        response_cache: Arc<C>,
        fetcher: Arc<F>,
        options: RequestWrapperOptions,
    ) -> Result<Self> {
        let cache_name =
            options.cache_name.unwrap_or_else(|| default_cache_name(scope));
        let registry = PluginRegistry::new(options.plugins)?;
        Ok(Self {
            response_cache,
            fetcher,
            registry: Arc::new(registry),
            cache_name,
            match_options: options.match_options,
            handle: OnceCell::new(),
        })
    }

    /// The cache name this wrapper is bound to.
    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    /// Lazily opens and memoises this wrapper's cache handle (spec §4.E).
    pub async fn get_cache(&self) -> Result<CacheHandle> {
        let handle = self
            .handle
            .get_or_try_init(|| {
                log::debug!("opening cache {}", self.cache_name);
                self.response_cache.open(&self.cache_name)
            })
            .await?;
        Ok(handle.clone())
    }

    /// `match({request})` from spec §4.E: a cache hit, passed through
    /// `cacheWillMatch` if one is registered. Misses, and transforms that
    /// map to `None`, both surface as `Ok(None)`.
    pub async fn match_request(
        &self,
        request: &FetchRequest,
    ) -> Result<Option<CachedResponse>> {
        let handle = self.get_cache().await?;
        let raw = self
            .response_cache
            .match_request(&handle, request, self.match_options)
            .await?;
        let Some(raw) = raw else {
            log::debug!("cache miss for {} in {}", request.url, self.cache_name);
            return Ok(None);
        };
        log::debug!("cache hit for {} in {}", request.url, self.cache_name);
        Ok(self.registry.run_cache_will_match(raw).await)
    }

    /// `fetch({request})` from spec §4.E: runs `requestWillFetch`
    /// sequentially, calls the network with the final request, and on
    /// failure runs every `fetchDidFail` before rethrowing.
    pub async fn fetch(&self, request: FetchRequest) -> Result<CachedResponse> {
        let rewritten = self.registry.run_request_will_fetch(request).await?;
        match self.fetcher.fetch(&rewritten).await {
            Ok(response) => Ok(response),
            Err(err) => {
                log::warn!("fetch failed for {}: {err}", rewritten.url);
                self.registry.run_fetch_did_fail(&rewritten).await;
                Err(err)
            }
        }
    }

    /// `fetchAndCache({request, waitOnCache?, cacheKey?})` from spec §4.E,
    /// steps 1 through 6.
    pub async fn fetch_and_cache(
        &self,
        request: FetchRequest,
        wait_on_cache: bool,
        cache_key: Option<FetchRequest>,
    ) -> Result<CachedResponse> {
        // Step 1.
        let response = self.fetch(request.clone()).await?;

        // Step 2.
        let cacheable =
            self.registry.run_cache_will_update(&request, &response).await?;

        if !cacheable {
            // Step 5.
            if wait_on_cache {
                return Err(CacheError::InvalidResponseForCaching);
            }
            // Step 6.
            return Ok(response);
        }

        // Step 3: clone, then write asynchronously.
        let to_cache = response.clone();
        let write = Self::write_to_cache(
            request,
            cache_key,
            to_cache,
            self.response_cache.clone(),
            self.registry.clone(),
            self.cache_name.clone(),
            self.match_options,
        );

        if wait_on_cache {
            // Step 4.
            write.await?;
        } else {
            tokio::spawn(write);
        }

        // Step 6.
        Ok(response)
    }

    /// The body of step 3 of `fetchAndCache`, factored out so it can either
    /// be awaited inline (`waitOnCache: true`) or handed to `tokio::spawn`
    /// as a fire-and-forget task (`waitOnCache: false`) without borrowing
    /// `self` across the `'static` boundary `tokio::spawn` requires (spec
    /// §9: "An implementation must keep it alive past the handler's
    /// return").
    #[allow(clippy::too_many_arguments)]
    fn write_to_cache(
        request: FetchRequest,
        cache_key: Option<FetchRequest>,
        response: CachedResponse,
        response_cache: Arc<C>,
        registry: Arc<PluginRegistry>,
        cache_name: String,
        match_options: MatchOptions,
    ) -> impl std::future::Future<Output = Result<()>> + Send + 'static {
        async move {
            // Step 3a: snapshot the old response only if someone is
            // listening and the new response is readable.
            let old_response = if registry.has_cache_did_update()
                && response.response_type.is_readable()
            {
                let handle = response_cache.open(&cache_name).await?;
                let raw = response_cache
                    .match_request(&handle, &request, match_options)
                    .await?;
                match raw {
                    Some(raw) => registry.run_cache_will_match(raw).await,
                    None => None,
                }
            } else {
                None
            };

            // Step 3b.
            let handle = response_cache.open(&cache_name).await?;
            let key = cache_key.as_ref().unwrap_or(&request);
            response_cache.put(&handle, key, response.clone()).await?;
            log::debug!("cached {} in {}", key.url, cache_name);

            // Step 3c.
            registry
                .run_cache_did_update(&cache_name, old_response.as_ref(), &response)
                .await;

            Ok(())
        }
    }
}

impl<C: ResponseCache, F: Fetcher> std::fmt::Debug for RequestWrapper<C, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestWrapper")
            .field("cache_name", &self.cache_name)
            .field("match_options", &self.match_options)
            .finish_non_exhaustive()
    }
}
