//! `r = wrapper.match(request)`; if `r` return `r`; else
//! `wrapper.fetchAndCache({request})` (spec §4.F).

use std::sync::Arc;

use super::Handler;
use crate::cache::ResponseCache;
use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::types::{CachedResponse, FetchRequest};
use crate::wrapper::RequestWrapper;

/// Serves from cache when present; otherwise fetches and caches.
pub struct CacheFirst<C: ResponseCache, F: Fetcher> {
    wrapper: Arc<RequestWrapper<C, F>>,
}

impl<C: ResponseCache, F: Fetcher> CacheFirst<C, F> {
    /// Binds this strategy to `wrapper`.
    pub fn new(wrapper: Arc<RequestWrapper<C, F>>) -> Self {
        Self { wrapper }
    }
}

#[async_trait::async_trait]
impl<C: ResponseCache, F: Fetcher> Handler for CacheFirst<C, F> {
    async fn handle(&self, request: FetchRequest) -> Result<CachedResponse> {
        if let Some(cached) = self.wrapper.match_request(&request).await? {
            return Ok(cached);
        }
        self.wrapper.fetch_and_cache(request, false, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MokaResponseCache;
    use crate::fetcher::MockFetcher;
    use crate::types::ResponseType;
    use crate::wrapper::RequestWrapperOptions;
    use url::Url;

    fn response(status: u16, body: &str) -> CachedResponse {
        CachedResponse {
            status,
            headers: http::HeaderMap::new(),
            body: bytes::Bytes::from(body.to_string()),
            url: Url::parse("https://example.com/a.css").unwrap(),
            response_type: ResponseType::Basic,
        }
    }

    #[tokio::test]
    async fn hit_returns_cached_body_without_touching_network() {
        let cache = Arc::new(MokaResponseCache::default());
        let request =
            FetchRequest::get(Url::parse("https://example.com/a.css").unwrap());
        let handle = cache.open("t1").await.unwrap();
        cache.put(&handle, &request, response(200, "x")).await.unwrap();

        // A fetcher with no registered responses: any call is a test
        // failure surfaced through the strategy's `Err`.
        let fetcher = Arc::new(MockFetcher::new());
        let wrapper = Arc::new(
            RequestWrapper::new(
                "t1",
                cache,
                fetcher,
                RequestWrapperOptions {
                    cache_name: Some("t1".into()),
                    ..Default::default()
                },
            )
            .unwrap(),
        );

        let got = CacheFirst::new(wrapper).handle(request).await.unwrap();
        assert_eq!(got.body, "x");
    }

    #[tokio::test]
    async fn miss_fetches_and_caches_the_cacheable_response() {
        let cache = Arc::new(MokaResponseCache::default());
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_response("https://example.com/a", response(200, "y")),
        );
        let wrapper = Arc::new(
            RequestWrapper::new(
                "t2",
                cache,
                fetcher,
                RequestWrapperOptions {
                    cache_name: Some("t2".into()),
                    ..Default::default()
                },
            )
            .unwrap(),
        );

        let request = FetchRequest::get(Url::parse("https://example.com/a").unwrap());
        let got = CacheFirst::new(wrapper.clone())
            .handle(request.clone())
            .await
            .unwrap();
        assert_eq!(got.body, "y");

        // fetch_and_cache's write runs in the background (waitOnCache is
        // false for CacheFirst); give it a beat to land.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let cached = wrapper.match_request(&request).await.unwrap();
        assert!(cached.is_some());
    }

    #[tokio::test]
    async fn miss_not_cacheable_leaves_cache_empty() {
        let cache = Arc::new(MokaResponseCache::default());
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_response("https://example.com/a", response(500, "err")),
        );
        let wrapper = Arc::new(
            RequestWrapper::new(
                "t3",
                cache,
                fetcher,
                RequestWrapperOptions {
                    cache_name: Some("t3".into()),
                    ..Default::default()
                },
            )
            .unwrap(),
        );

        let request = FetchRequest::get(Url::parse("https://example.com/a").unwrap());
        let got = CacheFirst::new(wrapper.clone())
            .handle(request.clone())
            .await
            .unwrap();
        assert_eq!(got.status, 500);
        assert!(wrapper.match_request(&request).await.unwrap().is_none());
    }
}
