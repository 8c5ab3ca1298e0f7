//! Start the cache lookup and a background revalidation fetch at the same
//! time; return the cache hit the instant it resolves without waiting on
//! the network, but still let the network write land (spec §4.F).

use std::sync::Arc;

use super::Handler;
use crate::cache::ResponseCache;
use crate::error::{CacheError, Result};
use crate::fetcher::Fetcher;
use crate::types::{CachedResponse, FetchRequest};
use crate::wrapper::RequestWrapper;

/// Serves a cached response immediately if present while kicking off a
/// background `fetchAndCache` to keep the entry fresh for next time.
pub struct StaleWhileRevalidate<C: ResponseCache, F: Fetcher> {
    wrapper: Arc<RequestWrapper<C, F>>,
}

impl<C: ResponseCache, F: Fetcher> StaleWhileRevalidate<C, F> {
    /// Binds this strategy to `wrapper`.
    pub fn new(wrapper: Arc<RequestWrapper<C, F>>) -> Self {
        Self { wrapper }
    }
}

#[async_trait::async_trait]
impl<C: ResponseCache, F: Fetcher> Handler for StaleWhileRevalidate<C, F> {
    async fn handle(&self, request: FetchRequest) -> Result<CachedResponse> {
        // The network leg always runs, detached, so it keeps updating the
        // cache even when a hit lets us return before it finishes.
        let background_wrapper = self.wrapper.clone();
        let background_request = request.clone();
        let network = tokio::spawn(async move {
            background_wrapper
                .fetch_and_cache(background_request, false, None)
                .await
        });

        if let Some(cached) = self.wrapper.match_request(&request).await? {
            return Ok(cached);
        }

        match network.await {
            Ok(result) => result,
            Err(_) => Err(CacheError::NoResponseReceived),
        }
    }
}
