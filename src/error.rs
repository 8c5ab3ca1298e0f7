//! Structured error construction and the argument/type assertions used at
//! plugin-registration and construction time.

use miette::Diagnostic;
use thiserror::Error;

/// A `Result` typedef to use with [`CacheError`].
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors raised by the request wrapper, the caching strategies, and the
/// expiration plugin.
///
/// Variants that correspond to a stable identifier from the spec (see
/// [`CacheError::code`]) carry that identifier as their `#[diagnostic(code(...))]`
/// and are matched on by name in tests, the same way `http-cache`'s
/// `CacheError` variants are matched on by callers that care about a
/// specific failure.
#[derive(Error, Diagnostic, Debug)]
pub enum CacheError {
    /// Two plugins each registered `cacheWillUpdate`; only one may.
    #[error("multiple-cache-will-update-plugins")]
    #[diagnostic(code(sw_cache::multiple_cache_will_update_plugins))]
    MultipleCacheWillUpdatePlugins,

    /// Two plugins each registered `cacheWillMatch`; only one may.
    #[error("multiple-cache-will-match-plugins")]
    #[diagnostic(code(sw_cache::multiple_cache_will_match_plugins))]
    MultipleCacheWillMatchPlugins,

    /// An `ExpirationPlugin` was constructed with neither `maxEntries` nor
    /// `maxAgeSeconds`.
    #[error("max-entries-or-age-required")]
    #[diagnostic(code(sw_cache::max_entries_or_age_required))]
    MaxEntriesOrAgeRequired,

    /// `maxEntries` was provided but was not a valid entry count. Part of
    /// the stable error vocabulary (spec §6); `ExpirationPlugin::new`'s own
    /// `Option<u64>` signature already rules this out structurally, so this
    /// crate never constructs it itself.
    #[error("max-entries-must-be-number")]
    #[diagnostic(code(sw_cache::max_entries_must_be_number))]
    MaxEntriesMustBeNumber,

    /// `maxAgeSeconds` was provided but was not a valid duration. Same
    /// status as [`CacheError::MaxEntriesMustBeNumber`].
    #[error("max-age-seconds-must-be-number")]
    #[diagnostic(code(sw_cache::max_age_seconds_must_be_number))]
    MaxAgeSecondsMustBeNumber,

    /// `fetchAndCache` was called with `waitOnCache: true` for a response
    /// that the cacheability decision rejected.
    #[error("invalid-response-for-caching")]
    #[diagnostic(code(sw_cache::invalid_response_for_caching))]
    InvalidResponseForCaching,

    /// `CacheOnly` found nothing in the cache.
    #[error("no-response-received")]
    #[diagnostic(code(sw_cache::no_response_received))]
    NoResponseReceived,

    /// The network call itself failed. The original error is preserved so
    /// strategies that define a fallback can still inspect it.
    #[error("network request failed: {0}")]
    #[diagnostic(code(sw_cache::fetch_failed))]
    FetchFailed(String),

    /// A `requestWillFetch` callback rejected instead of resolving to a
    /// `Request`.
    #[error("requestWillFetch callback failed: {0}")]
    #[diagnostic(code(sw_cache::request_will_fetch_failed))]
    RequestWillFetchFailed(String),

    /// The configured response cache backend returned an error.
    #[error("response cache error: {0}")]
    #[diagnostic(code(sw_cache::cache_backend))]
    CacheBackend(String),

    /// The configured timestamp index backend returned an error.
    #[error("timestamp index error: {0}")]
    #[diagnostic(code(sw_cache::index_backend))]
    IndexBackend(String),

    /// Error parsing or constructing a URL.
    #[error(transparent)]
    #[diagnostic(code(sw_cache::invalid_url))]
    InvalidUrl(#[from] url::ParseError),

    /// Error from the `http` crate's builders (status codes, header names).
    #[error(transparent)]
    #[diagnostic(code(sw_cache::http))]
    Http(#[from] http::Error),

    /// Error converting a header value to a string.
    #[error(transparent)]
    #[diagnostic(code(sw_cache::header_to_str))]
    HeaderToStr(#[from] http::header::ToStrError),

    /// Error serializing or deserializing a cached record.
    #[cfg(feature = "cache-disk")]
    #[error(transparent)]
    #[diagnostic(code(sw_cache::postcard))]
    Postcard(#[from] postcard::Error),

    /// Error from the on-disk cache backend.
    #[cfg(feature = "cache-disk")]
    #[error(transparent)]
    #[diagnostic(code(sw_cache::cacache))]
    CaCache(#[from] cacache::Error),
}

impl CacheError {
    /// The stable string identifier from spec §6, suitable for
    /// `assert_eq!(err.code(), "multiple-cache-will-update-plugins")`-style
    /// test assertions.
    pub fn code(&self) -> &'static str {
        match self {
            CacheError::MultipleCacheWillUpdatePlugins => {
                "multiple-cache-will-update-plugins"
            }
            CacheError::MultipleCacheWillMatchPlugins => {
                "multiple-cache-will-match-plugins"
            }
            CacheError::MaxEntriesOrAgeRequired => {
                "max-entries-or-age-required"
            }
            CacheError::MaxEntriesMustBeNumber => {
                "max-entries-must-be-number"
            }
            CacheError::MaxAgeSecondsMustBeNumber => {
                "max-age-seconds-must-be-number"
            }
            CacheError::InvalidResponseForCaching => {
                "invalid-response-for-caching"
            }
            CacheError::NoResponseReceived => "no-response-received",
            CacheError::FetchFailed(_) => "fetch-failed",
            CacheError::RequestWillFetchFailed(_) => {
                "request-will-fetch-failed"
            }
            CacheError::CacheBackend(_) => "cache-backend",
            CacheError::IndexBackend(_) => "index-backend",
            CacheError::InvalidUrl(_) => "invalid-url",
            CacheError::Http(_) => "http",
            CacheError::HeaderToStr(_) => "header-to-str",
            #[cfg(feature = "cache-disk")]
            CacheError::Postcard(_) => "postcard",
            #[cfg(feature = "cache-disk")]
            CacheError::CaCache(_) => "cacache",
        }
    }
}

/// Asserts that exactly zero or one of the given plugins implements the
/// given transform hook, failing with the matching `CacheError` variant
/// otherwise. Used by `RequestWrapper::new` for both transform hooks.
pub(crate) fn assert_single_transform_plugin(
    count: usize,
    on_violation: CacheError,
) -> Result<()> {
    if count > 1 {
        Err(on_violation)
    } else {
        Ok(())
    }
}

/// Asserts that an `ExpirationPlugin` was given at least one bound. Rust's
/// `Option<u64>` already guarantees the "must be a number" half of spec
/// §4.G's constructor contract structurally; zero is a valid bound (evict
/// everything on every write), not a type error, so it is not rejected here.
pub(crate) fn assert_expiration_bounds(
    max_entries: Option<u64>,
    max_age_seconds: Option<u64>,
) -> Result<()> {
    if max_entries.is_none() && max_age_seconds.is_none() {
        return Err(CacheError::MaxEntriesOrAgeRequired);
    }
    Ok(())
}
