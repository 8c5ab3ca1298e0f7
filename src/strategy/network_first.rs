//! Race the network against an optional timeout, falling back to the cache
//! without ever returning an empty win (spec §4.F, §9).
//!
//! Workbox's own `NetworkFirst` is the origin of this shape: start the
//! network fetch, and if `networkTimeoutSeconds` elapses first, check the
//! cache — but only a cache *hit* is allowed to pre-empt the network; an
//! empty cache must keep waiting on the original fetch rather than
//! resolving with nothing.

use std::sync::Arc;
use std::time::Duration;

use super::Handler;
use crate::cache::ResponseCache;
use crate::error::{CacheError, Result};
use crate::fetcher::Fetcher;
use crate::types::{CachedResponse, FetchRequest};
use crate::wrapper::RequestWrapper;

/// Tries the network first, falling back to the cache on failure or
/// (when configured) on a timeout with an existing cache entry to serve.
pub struct NetworkFirst<C: ResponseCache, F: Fetcher> {
    wrapper: Arc<RequestWrapper<C, F>>,
    network_timeout: Option<Duration>,
}

impl<C: ResponseCache, F: Fetcher> NetworkFirst<C, F> {
    /// Binds this strategy to `wrapper`. `network_timeout_seconds` mirrors
    /// spec §9's optional race timer; `None` means "wait for the network
    /// indefinitely".
    pub fn new(
        wrapper: Arc<RequestWrapper<C, F>>,
        network_timeout_seconds: Option<u64>,
    ) -> Self {
        Self {
            wrapper,
            network_timeout: network_timeout_seconds.map(Duration::from_secs),
        }
    }

    async fn fallback_to_cache(&self, request: &FetchRequest, network_err: CacheError) -> Result<CachedResponse> {
        self.wrapper
            .match_request(request)
            .await?
            .ok_or(network_err)
    }
}

#[async_trait::async_trait]
impl<C: ResponseCache, F: Fetcher> Handler for NetworkFirst<C, F> {
    async fn handle(&self, request: FetchRequest) -> Result<CachedResponse> {
        let Some(timeout) = self.network_timeout else {
            return match self.wrapper.fetch_and_cache(request.clone(), false, None).await {
                Ok(response) => Ok(response),
                Err(err) => self.fallback_to_cache(&request, err).await,
            };
        };

        let network = self.wrapper.fetch_and_cache(request.clone(), false, None);
        tokio::pin!(network);

        tokio::select! {
            result = &mut network => {
                match result {
                    Ok(response) => Ok(response),
                    Err(err) => self.fallback_to_cache(&request, err).await,
                }
            }
            _ = tokio::time::sleep(timeout) => {
                // The timer only wins if the cache actually has something;
                // an empty cache means we keep waiting on the network.
                if let Some(cached) = self.wrapper.match_request(&request).await? {
                    return Ok(cached);
                }
                match network.await {
                    Ok(response) => Ok(response),
                    Err(err) => self.fallback_to_cache(&request, err).await,
                }
            }
        }
    }
}
