//! `return wrapper.fetch({request})`, no cache interaction at all
//! (spec §4.F).

use std::sync::Arc;

use super::Handler;
use crate::cache::ResponseCache;
use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::types::{CachedResponse, FetchRequest};
use crate::wrapper::RequestWrapper;

/// Always goes to the network; never reads or writes the cache.
pub struct NetworkOnly<C: ResponseCache, F: Fetcher> {
    wrapper: Arc<RequestWrapper<C, F>>,
}

impl<C: ResponseCache, F: Fetcher> NetworkOnly<C, F> {
    /// Binds this strategy to `wrapper`.
    pub fn new(wrapper: Arc<RequestWrapper<C, F>>) -> Self {
        Self { wrapper }
    }
}

#[async_trait::async_trait]
impl<C: ResponseCache, F: Fetcher> Handler for NetworkOnly<C, F> {
    async fn handle(&self, request: FetchRequest) -> Result<CachedResponse> {
        self.wrapper.fetch(request).await
    }
}
