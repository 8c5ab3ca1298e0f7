//! Return `wrapper.match(request)` or fail with a missing-response error
//! if none (spec §4.F).

use std::sync::Arc;

use super::Handler;
use crate::cache::ResponseCache;
use crate::error::{CacheError, Result};
use crate::fetcher::Fetcher;
use crate::types::{CachedResponse, FetchRequest};
use crate::wrapper::RequestWrapper;

/// Never touches the network; serves only from cache.
pub struct CacheOnly<C: ResponseCache, F: Fetcher> {
    wrapper: Arc<RequestWrapper<C, F>>,
}

impl<C: ResponseCache, F: Fetcher> CacheOnly<C, F> {
    /// Binds this strategy to `wrapper`.
    pub fn new(wrapper: Arc<RequestWrapper<C, F>>) -> Self {
        Self { wrapper }
    }
}

#[async_trait::async_trait]
impl<C: ResponseCache, F: Fetcher> Handler for CacheOnly<C, F> {
    async fn handle(&self, request: FetchRequest) -> Result<CachedResponse> {
        self.wrapper
            .match_request(&request)
            .await?
            .ok_or(CacheError::NoResponseReceived)
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

    fn wrapper(
        name: &str,
        cache: Arc<MokaResponseCache>,
    ) -> Arc<RequestWrapper<MokaResponseCache, MockFetcher>> {
        Arc::new(
            RequestWrapper::new(
                name,
                cache,
                Arc::new(MockFetcher::new()),
                RequestWrapperOptions {
                    cache_name: Some(name.into()),
                    ..Default::default()
                },
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn hit_returns_the_cached_response() {
        let cache = Arc::new(MokaResponseCache::default());
        let request = FetchRequest::get(Url::parse("https://example.com/a").unwrap());
        let handle = cache.open("co").await.unwrap();
        cache
            .put(
                &handle,
                &request,
                CachedResponse {
                    status: 200,
                    headers: http::HeaderMap::new(),
                    body: bytes::Bytes::from_static(b"cached"),
                    url: request.url.clone(),
                    response_type: ResponseType::Basic,
                },
            )
            .await
            .unwrap();

        let got = CacheOnly::new(wrapper("co", cache))
            .handle(request)
            .await
            .unwrap();
        assert_eq!(got.body, "cached");
    }

    #[tokio::test]
    async fn miss_fails_with_no_response_received() {
        let cache = Arc::new(MokaResponseCache::default());
        let request = FetchRequest::get(Url::parse("https://example.com/missing").unwrap());
        let err = CacheOnly::new(wrapper("co2", cache))
            .handle(request)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "no-response-received");
    }
}
