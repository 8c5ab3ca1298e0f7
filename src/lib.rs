#![forbid(unsafe_code, future_incompatible)]
#![deny(
    missing_debug_implementations,
    nonstandard_style,
    unused_qualifications,
    unused_import_braces,
    unused_extern_crates,
    trivial_casts,
    trivial_numeric_casts
)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! A client-side HTTP caching toolkit built for the service-worker
//! request/response lifecycle: a [`wrapper::RequestWrapper`] that mediates
//! every fetch and cache operation, a family of [`strategy`] handlers
//! (cache-first, network-first, stale-while-revalidate, cache-only,
//! network-only) built on top of it, and an [`expiration::ExpirationPlugin`]
//! that evicts by LRU and/or max-age.
//!
//! This crate has no browser bindings of its own. Where a real service
//! worker would reach for the global `caches`, `fetch`, and `indexedDB`
//! objects, this crate asks the embedder for three small traits instead:
//!
//! - [`cache::ResponseCache`] — the named response store (`caches.open` /
//!   `cache.match` / `cache.put` / `cache.delete`). Ships two backends:
//!   [`cache::MokaResponseCache`] (in-memory, default) and, behind
//!   `cache-disk`, [`cache::CacacheResponseCache`] (content-addressed disk
//!   storage via `cacache`).
//! - [`fetcher::Fetcher`] — the network call. Ships [`fetcher::MockFetcher`]
//!   for tests; a wasm service worker would implement this over
//!   `web_sys::WorkerGlobalScope::fetch_with_request`, a native embedder over
//!   `reqwest` or `hyper`.
//! - [`index::TimestampStore`] — the local key/value database the
//!   expiration plugin uses to track write times. Ships
//!   [`index::InMemoryTimestampStore`].
//!
//! ## Basic usage
//!
//! ```rust
//! # #[cfg(feature = "cache-moka")]
//! # #[tokio::main]
//! # async fn main() -> Result<(), sw_cache::error::CacheError> {
//! use std::sync::Arc;
//! use sw_cache::cache::MokaResponseCache;
//! use sw_cache::fetcher::MockFetcher;
//! use sw_cache::strategy::{CacheFirst, Handler};
//! use sw_cache::types::{CachedResponse, FetchRequest, ResponseType};
//! use sw_cache::wrapper::{RequestWrapper, RequestWrapperOptions};
//! use url::Url;
//!
//! let url = Url::parse("https://example.com/a.css")?;
//! let fetcher = Arc::new(MockFetcher::new().with_response(
//!     url.as_str(),
//!     CachedResponse {
//!         status: 200,
//!         headers: http::HeaderMap::new(),
//!         body: bytes::Bytes::from_static(b"body { color: red }"),
//!         url: url.clone(),
//!         response_type: ResponseType::Basic,
//!     },
//! ));
//!
//! let wrapper = Arc::new(RequestWrapper::new(
//!     "https://example.com/",
//!     Arc::new(MokaResponseCache::default()),
//!     fetcher,
//!     RequestWrapperOptions::default(),
//! )?);
//!
//! let strategy = CacheFirst::new(wrapper);
//! let response = strategy.handle(FetchRequest::get(url)).await?;
//! assert_eq!(response.status, 200);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "cache-moka"))]
//! # fn main() {}
//! ```
//!
//! ## Cache modes
//!
//! [`strategy::CacheFirst`], [`strategy::CacheOnly`], [`strategy::NetworkOnly`],
//! [`strategy::NetworkFirst`], and [`strategy::StaleWhileRevalidate`] cover the
//! five request→response policies described in the design (spec §4.F); each
//! is a thin struct bound to one [`wrapper::RequestWrapper`], constructed
//! directly or dispatched at runtime through
//! [`strategy::CacheStrategyKind`].

pub mod cache;
pub mod error;
pub mod expiration;
pub mod fetcher;
pub mod index;
pub mod plugin;
pub mod strategy;
pub mod types;
pub mod wrapper;
