//! Caching strategies (spec §4.F): the five request→response state
//! machines built on top of [`RequestWrapper`](crate::wrapper::RequestWrapper).
//!
//! Each strategy forwards its construction options straight to its own
//! `RequestWrapper` and is bound to exactly one cache name for its lifetime
//! (spec §3). This mirrors the minimum interface a request-routing layer
//! needs (spec §1 marks the router itself out of scope): construct a
//! handler, call `handle`.

mod cache_first;
mod cache_only;
mod network_first;
mod network_only;
mod stale_while_revalidate;

pub use cache_first::CacheFirst;
pub use cache_only::CacheOnly;
pub use network_first::NetworkFirst;
pub use network_only::NetworkOnly;
pub use stale_while_revalidate::StaleWhileRevalidate;

use std::sync::Arc;

use crate::cache::ResponseCache;
use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::types::{CachedResponse, FetchRequest};
use crate::wrapper::RequestWrapper;

/// A bound policy object whose `handle` yields a response for one request.
/// The minimum surface spec.md's out-of-scope router dispatches to.
#[async_trait::async_trait]
pub trait Handler: Send + Sync {
    /// Executes this strategy for `request`.
    async fn handle(&self, request: FetchRequest) -> Result<CachedResponse>;
}

/// Names one of the five strategies without committing to its concrete
/// type, for embedders whose router picks a strategy at runtime (e.g. from
/// a URL-pattern table) rather than at compile time. This is the minimum
/// interface to the request-routing layer spec.md §1 marks out of scope:
/// "construct a handler, call `handle`".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStrategyKind {
    /// [`CacheFirst`].
    CacheFirst,
    /// [`CacheOnly`].
    CacheOnly,
    /// [`NetworkOnly`].
    NetworkOnly,
    /// [`NetworkFirst`], with an optional race timeout in seconds.
    NetworkFirst {
        /// Forwarded to [`NetworkFirst::new`].
        network_timeout_seconds: Option<u64>,
    },
    /// [`StaleWhileRevalidate`].
    StaleWhileRevalidate,
}

impl CacheStrategyKind {
    /// Builds the concrete handler this variant names, bound to `wrapper`.
    pub fn build<C: ResponseCache, F: Fetcher>(
        self,
        wrapper: Arc<RequestWrapper<C, F>>,
    ) -> Box<dyn Handler> {
        match self {
            CacheStrategyKind::CacheFirst => Box::new(CacheFirst::new(wrapper)),
            CacheStrategyKind::CacheOnly => Box::new(CacheOnly::new(wrapper)),
            CacheStrategyKind::NetworkOnly => Box::new(NetworkOnly::new(wrapper)),
            CacheStrategyKind::NetworkFirst { network_timeout_seconds } => {
                Box::new(NetworkFirst::new(wrapper, network_timeout_seconds))
            }
            CacheStrategyKind::StaleWhileRevalidate => {
                Box::new(StaleWhileRevalidate::new(wrapper))
            }
        }
    }
}

#[cfg(test)]
mod kind_tests {
    use super::*;
    use crate::cache::MokaResponseCache;
    use crate::fetcher::MockFetcher;
    use crate::wrapper::RequestWrapperOptions;
    use url::Url;

    #[tokio::test]
    async fn build_dispatches_to_the_named_strategy() {
        let cache = Arc::new(MokaResponseCache::default());
        let request = FetchRequest::get(Url::parse("https://example.com/a").unwrap());
        let handle = cache.open("kind").await.unwrap();
        cache
            .put(
                &handle,
                &request,
                CachedResponse {
                    status: 200,
                    headers: http::HeaderMap::new(),
                    body: bytes::Bytes::from_static(b"cached"),
                    url: request.url.clone(),
                    response_type: crate::types::ResponseType::Basic,
                },
            )
            .await
            .unwrap();

        let wrapper = Arc::new(
            RequestWrapper::new(
                "kind",
                cache,
                Arc::new(MockFetcher::new()),
                RequestWrapperOptions {
                    cache_name: Some("kind".into()),
                    ..Default::default()
                },
            )
            .unwrap(),
        );

        let handler = CacheStrategyKind::CacheOnly.build(wrapper);
        let got = handler.handle(request).await.unwrap();
        assert_eq!(got.body, "cached");
    }
}
