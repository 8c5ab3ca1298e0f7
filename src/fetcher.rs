//! The network boundary (spec §6: "Network fetch: `fetch(request, init)`").
//!
//! A real service worker calls the global `fetch()`; this crate instead
//! asks embedders for a [`Fetcher`] implementation, the same substitution
//! `RequestWrapper` makes for the response cache and the timestamp index.
//! A native embedder might implement this over `reqwest` or `hyper`; a wasm
//! service worker would implement it over `web_sys::WorkerGlobalScope::fetch_with_request`.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CachedResponse, FetchRequest};

/// Performs the network call a `RequestWrapper` drives after running
/// `requestWillFetch`. Implementations should map transport failures (DNS,
/// connection refused, timeout) to `Err`, not to an error-status
/// `CachedResponse` — the wrapper relies on `Err` to decide when
/// `fetchDidFail` runs (spec §4.E, §7 item 3).
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    /// Issues the network request and returns the resulting response.
    async fn fetch(&self, request: &FetchRequest) -> Result<CachedResponse>;
}

/// A fixed-responses, fixed-failures test double. Not feature-gated:
/// `http-cache`'s own test suite (`src/test.rs`) keeps its mock HTTP server
/// wiring directly in the crate rather than behind a feature, and fakes
/// this small are cheap enough to ship unconditionally for downstream
/// integration tests too.
#[derive(Debug, Default, Clone)]
pub struct MockFetcher {
    responses: std::collections::HashMap<String, MockOutcome>,
    delay: Option<std::time::Duration>,
}

#[derive(Debug, Clone)]
enum MockOutcome {
    Response(CachedResponse),
    Fail(String),
}

impl MockFetcher {
    /// An empty fetcher; every request fails with a generic network error
    /// unless configured otherwise.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a successful response for the given URL.
    pub fn with_response(mut self, url: &str, response: CachedResponse) -> Self {
        self.responses
            .insert(url.to_string(), MockOutcome::Response(response));
        self
    }

    /// Registers a network failure for the given URL.
    pub fn with_failure(mut self, url: &str, message: &str) -> Self {
        self.responses
            .insert(url.to_string(), MockOutcome::Fail(message.to_string()));
        self
    }

    /// Makes every resolution sleep for `delay` first, so tests driving
    /// virtual time (`tokio::time::pause`) can exercise races against it.
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<CachedResponse> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.responses.get(request.url.as_str()) {
            Some(MockOutcome::Response(response)) => Ok(response.clone()),
            Some(MockOutcome::Fail(message)) => {
                Err(crate::error::CacheError::FetchFailed(message.clone()))
            }
            None => Err(crate::error::CacheError::FetchFailed(format!(
                "no mock response registered for {}",
                request.url
            ))),
        }
    }
}
