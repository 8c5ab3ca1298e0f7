//! The plugin protocol (spec §4.D): five lifecycle hooks, with
//! `cacheWillUpdate` and `cacheWillMatch` restricted to at most one plugin
//! each, and `requestWillFetch` / `fetchDidFail` / `cacheDidUpdate` open to
//! any number of listeners invoked in registration order.
//!
//! Grounded in `http-cache`'s `HttpCacheOptions` callback fields
//! (`cache_key`, `cache_mode_fn`, `response_cache_mode_fn`), each an
//! `Option<Arc<dyn Fn(...) -> ... + Send + Sync>>` — the same closure-bag
//! shape, generalized here into a trait with default no-op methods because
//! our plugins (the caching strategies' own bookkeeping, the expiration
//! plugin) are typed structs rather than bare closures.

use std::sync::Arc;

use crate::error::{assert_single_transform_plugin, CacheError, Result};
use crate::types::{CachedResponse, FetchRequest};

/// The five hook names from spec §4.D.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Hook {
    /// Transform the outgoing request before `fetch` (N plugins).
    RequestWillFetch,
    /// Observe a network failure (N plugins).
    FetchDidFail,
    /// Decide whether a response is cacheable (at most 1 plugin).
    CacheWillUpdate,
    /// Observe a successful cache write (N plugins).
    CacheDidUpdate,
    /// Transform a cached response after a cache hit (at most 1 plugin).
    CacheWillMatch,
}

/// A bag of lifecycle callbacks a `RequestWrapper` fans out to. A plugin
/// implements only the hooks it cares about; unimplemented hooks use the
/// defaults below, matching spec §4.D ("hooks the plugin does not
/// implement are simply absent").
#[async_trait::async_trait]
pub trait Plugin: Send + Sync {
    /// Whether this plugin provides a non-default implementation of `hook`.
    /// Used by [`PluginRegistry::new`] to enforce the single-transform-hook
    /// invariant without requiring every plugin to also track this
    /// separately.
    fn implements(&self, hook: Hook) -> bool {
        let _ = hook;
        false
    }

    /// `requestWillFetch`: may rewrite the request before the network call.
    /// The default passes the request through unchanged.
    async fn request_will_fetch(
        &self,
        request: FetchRequest,
    ) -> Result<FetchRequest> {
        Ok(request)
    }

    /// `fetchDidFail`: observes the original (pre-rewrite) request after a
    /// network failure. Errors from this hook are swallowed by the caller
    /// (spec §4.D) — implementations should not expect failures here to
    /// propagate.
    async fn fetch_did_fail(&self, request: &FetchRequest) {
        let _ = request;
    }

    /// `cacheWillUpdate`: decides cacheability. The default policy mirrors
    /// spec §4.D's "if no plugin registers this hook": `response.ok`.
    async fn cache_will_update(
        &self,
        _request: &FetchRequest,
        response: &CachedResponse,
    ) -> Result<bool> {
        Ok(response.is_ok())
    }

    /// `cacheDidUpdate`: observes a completed cache write.
    async fn cache_did_update(
        &self,
        cache_name: &str,
        old_response: Option<&CachedResponse>,
        new_response: &CachedResponse,
    ) {
        let _ = (cache_name, old_response, new_response);
    }

    /// `cacheWillMatch`: transforms (or vetoes) a raw cache hit before it
    /// reaches the caller. The default passes the response through.
    async fn cache_will_match(
        &self,
        cached_response: CachedResponse,
    ) -> Option<CachedResponse> {
        Some(cached_response)
    }
}

/// The ordered registry of plugins bound to one `RequestWrapper`.
///
/// Construction fails with `CacheError::MultipleCacheWillUpdatePlugins` /
/// `MultipleCacheWillMatchPlugins` if more than one registered plugin
/// claims the corresponding transform hook (spec §3, "Plugin registry").
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
    has_cache_will_update: bool,
    has_cache_will_match: bool,
    has_cache_did_update: bool,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("len", &self.plugins.len())
            .field("has_cache_will_update", &self.has_cache_will_update)
            .field("has_cache_will_match", &self.has_cache_will_match)
            .field("has_cache_did_update", &self.has_cache_did_update)
            .finish()
    }
}

impl PluginRegistry {
    /// Builds a registry from an ordered plugin list, validating the
    /// single-transform-hook invariants.
    pub fn new(plugins: Vec<Arc<dyn Plugin>>) -> Result<Self> {
        let update_count = plugins
            .iter()
            .filter(|p| p.implements(Hook::CacheWillUpdate))
            .count();
        assert_single_transform_plugin(
            update_count,
            CacheError::MultipleCacheWillUpdatePlugins,
        )?;

        let match_count = plugins
            .iter()
            .filter(|p| p.implements(Hook::CacheWillMatch))
            .count();
        assert_single_transform_plugin(
            match_count,
            CacheError::MultipleCacheWillMatchPlugins,
        )?;

        let has_cache_did_update =
            plugins.iter().any(|p| p.implements(Hook::CacheDidUpdate));

        Ok(Self {
            has_cache_will_update: update_count == 1,
            has_cache_will_match: match_count == 1,
            has_cache_did_update,
            plugins,
        })
    }

    /// An empty registry: every hook uses its default.
    pub fn empty() -> Self {
        Self {
            plugins: Vec::new(),
            has_cache_will_update: false,
            has_cache_will_match: false,
            has_cache_did_update: false,
        }
    }

    /// Whether a `cacheDidUpdate` listener is registered. Gates the
    /// `oldResponse` snapshot in `fetch_and_cache` (spec §4.E step 3a).
    pub fn has_cache_did_update(&self) -> bool {
        self.has_cache_did_update
    }

    /// Runs `requestWillFetch` across all plugins, sequentially, each
    /// input being the previous output (spec §4.E, §8 "Request rewrite
    /// order").
    pub async fn run_request_will_fetch(
        &self,
        mut request: FetchRequest,
    ) -> Result<FetchRequest> {
        for plugin in &self.plugins {
            request = plugin.request_will_fetch(request).await.map_err(|e| {
                CacheError::RequestWillFetchFailed(e.to_string())
            })?;
        }
        Ok(request)
    }

    /// Runs `fetchDidFail` across all plugins with the final (rewritten)
    /// request. Spec §4.D notes the *original* Request is passed to
    /// `fetchDidFail`; "original" there means the input to the network
    /// call, i.e. the request after `requestWillFetch` rewriting and before
    /// any cache-key substitution — exactly what callers already hold by
    /// the time the network call fails.
    pub async fn run_fetch_did_fail(&self, request: &FetchRequest) {
        for plugin in &self.plugins {
            plugin.fetch_did_fail(request).await;
        }
    }

    /// Runs the single `cacheWillUpdate` plugin if registered, otherwise
    /// applies the default policy (`response.ok`).
    pub async fn run_cache_will_update(
        &self,
        request: &FetchRequest,
        response: &CachedResponse,
    ) -> Result<bool> {
        if self.has_cache_will_update {
            for plugin in &self.plugins {
                if plugin.implements(Hook::CacheWillUpdate) {
                    return plugin.cache_will_update(request, response).await;
                }
            }
        }
        Ok(response.is_ok())
    }

    /// Runs `cacheDidUpdate` across all plugins in registration order.
    pub async fn run_cache_did_update(
        &self,
        cache_name: &str,
        old_response: Option<&CachedResponse>,
        new_response: &CachedResponse,
    ) {
        for plugin in &self.plugins {
            plugin
                .cache_did_update(cache_name, old_response, new_response)
                .await;
        }
    }

    /// Runs the single `cacheWillMatch` plugin if registered, otherwise
    /// passes `cached_response` through unchanged.
    pub async fn run_cache_will_match(
        &self,
        cached_response: CachedResponse,
    ) -> Option<CachedResponse> {
        if self.has_cache_will_match {
            for plugin in &self.plugins {
                if plugin.implements(Hook::CacheWillMatch) {
                    return plugin.cache_will_match(cached_response).await;
                }
            }
        }
        Some(cached_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct UpdatePlugin;
    #[async_trait::async_trait]
    impl Plugin for UpdatePlugin {
        fn implements(&self, hook: Hook) -> bool {
            hook == Hook::CacheWillUpdate
        }
    }

    struct MatchPlugin;
    #[async_trait::async_trait]
    impl Plugin for MatchPlugin {
        fn implements(&self, hook: Hook) -> bool {
            hook == Hook::CacheWillMatch
        }
    }

    #[test]
    fn two_cache_will_update_plugins_fail_construction() {
        let err = PluginRegistry::new(vec![
            Arc::new(UpdatePlugin),
            Arc::new(UpdatePlugin),
        ])
        .unwrap_err();
        assert_eq!(err.code(), "multiple-cache-will-update-plugins");
    }

    #[test]
    fn two_cache_will_match_plugins_fail_construction() {
        let err = PluginRegistry::new(vec![
            Arc::new(MatchPlugin),
            Arc::new(MatchPlugin),
        ])
        .unwrap_err();
        assert_eq!(err.code(), "multiple-cache-will-match-plugins");
    }

    #[test]
    fn one_of_each_transform_plugin_is_fine() {
        assert!(PluginRegistry::new(vec![
            Arc::new(UpdatePlugin),
            Arc::new(MatchPlugin),
        ])
        .is_ok());
    }

    struct RewritingPlugin {
        tag: &'static str,
        order: Arc<std::sync::Mutex<Vec<&'static str>>>,
    }

    #[async_trait::async_trait]
    impl Plugin for RewritingPlugin {
        fn implements(&self, hook: Hook) -> bool {
            hook == Hook::RequestWillFetch
        }

        async fn request_will_fetch(
            &self,
            mut request: FetchRequest,
        ) -> Result<FetchRequest> {
            self.order.lock().unwrap().push(self.tag);
            request
                .url
                .query_pairs_mut()
                .append_pair("via", self.tag);
            Ok(request)
        }
    }

    #[tokio::test]
    async fn request_rewrite_order_is_registration_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let registry = PluginRegistry::new(vec![
            Arc::new(RewritingPlugin { tag: "p1", order: order.clone() }),
            Arc::new(RewritingPlugin { tag: "p2", order: order.clone() }),
        ])
        .unwrap();

        let request =
            FetchRequest::get(url::Url::parse("https://example.com/a").unwrap());
        let rewritten =
            registry.run_request_will_fetch(request).await.unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["p1", "p2"]);
        assert_eq!(rewritten.url.query(), Some("via=p1&via=p2"));
    }

    #[tokio::test]
    async fn default_cacheability_is_response_ok() {
        let registry = PluginRegistry::empty();
        let request =
            FetchRequest::get(url::Url::parse("https://example.com/a").unwrap());
        let ok_response = CachedResponse {
            status: 200,
            headers: http::HeaderMap::new(),
            body: bytes::Bytes::new(),
            url: request.url.clone(),
            response_type: crate::types::ResponseType::Basic,
        };
        let not_found = CachedResponse { status: 404, ..ok_response.clone() };

        assert!(registry
            .run_cache_will_update(&request, &ok_response)
            .await
            .unwrap());
        assert!(!registry
            .run_cache_will_update(&request, &not_found)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn fetch_did_fail_runs_every_observer() {
        let calls = Arc::new(AtomicUsize::new(0));

        struct CountingObserver(Arc<AtomicUsize>);
        #[async_trait::async_trait]
        impl Plugin for CountingObserver {
            fn implements(&self, hook: Hook) -> bool {
                hook == Hook::FetchDidFail
            }
            async fn fetch_did_fail(&self, _request: &FetchRequest) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let registry = PluginRegistry::new(vec![
            Arc::new(CountingObserver(calls.clone())),
            Arc::new(CountingObserver(calls.clone())),
        ])
        .unwrap();

        let request =
            FetchRequest::get(url::Url::parse("https://example.com/a").unwrap());
        registry.run_fetch_did_fail(&request).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
