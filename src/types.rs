//! The request/response vocabulary every other module speaks in terms of.
//!
//! There is no browser `Request`/`Response` binding here: embedders convert
//! to and from their own platform types (`web-sys::Request`, a native test
//! double, ...) at the edge. Everything inside this crate works with
//! [`FetchRequest`] and [`CachedResponse`].

use std::time::{Duration, SystemTime};

use http::{HeaderMap, Method};
use serde::{Deserialize, Serialize};
use url::Url;

/// The Fetch-API response type, carried alongside a cached response so that
/// opaque responses can be recognized without inspecting headers or status.
///
/// Mirrors the handful of values the Fetch spec defines; kept
/// `#[non_exhaustive]` the way `http-cache`'s `HttpVersion` is, since this
/// is a closed external vocabulary this crate doesn't own.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[non_exhaustive]
pub enum ResponseType {
    /// A same-origin response with full header and body visibility.
    Basic,
    /// A CORS response with a restricted, but still readable, header set.
    Cors,
    /// A cross-origin response whose status, headers, and body are
    /// unreadable to script. Never freshness-checked (§3).
    Opaque,
    /// An opaque response to a redirected request.
    OpaqueRedirect,
    /// A network error masquerading as a response.
    Error,
}

impl ResponseType {
    /// Whether this response type's headers may be read. Only `Opaque` and
    /// `OpaqueRedirect` responses are unreadable per spec §3.
    pub fn is_readable(&self) -> bool {
        !matches!(self, ResponseType::Opaque | ResponseType::OpaqueRedirect)
    }
}

/// An outbound request, used both as the network input and as the cache
/// fingerprint unless a strategy supplies an explicit `cache_key` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// The HTTP method.
    pub method: Method,
    /// The target URL.
    pub url: Url,
    /// Request headers, used by the platform cache to evaluate `Vary`.
    pub headers: HeaderMap,
}

impl FetchRequest {
    /// Builds a minimal GET request for the given URL.
    pub fn get(url: Url) -> Self {
        Self { method: Method::GET, url, headers: HeaderMap::new() }
    }

    /// The default request fingerprint: method + URL. Vary-relevant header
    /// comparison is left to the `ResponseCache` implementation, the way
    /// the platform `Cache` object owns that comparison in a real service
    /// worker (§3, "Request fingerprint").
    pub fn fingerprint(&self) -> String {
        format!("{}:{}", self.method, self.url)
    }
}

/// A cached or freshly fetched response.
///
/// Analogous to `http-cache`'s `HttpResponse`, minus the fields (warning
/// header helpers, HTTP version) that only matter to an RFC 7234
/// revalidation engine this crate doesn't implement.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CachedResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers. Only meaningful to read when `response_type.is_readable()`.
    #[serde(with = "header_map_serde")]
    pub headers: HeaderMap,
    /// Response body.
    pub body: bytes::Bytes,
    /// The URL the response was fetched from (may differ from the request
    /// URL after a redirect).
    pub url: Url,
    /// The Fetch-API response type.
    pub response_type: ResponseType,
}

impl CachedResponse {
    /// Whether this response's status indicates success (2xx). Used as the
    /// default `cacheWillUpdate` policy when no plugin overrides it (§4.D).
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parses this response's `Date` header, per `isResponseFresh` (§4.G):
    /// absent or unparseable is reported as `None`, which callers treat as
    /// "fresh" rather than as an error.
    pub fn parsed_date(&self) -> Option<SystemTime> {
        self.headers
            .get(http::header::DATE)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| httpdate::parse_http_date(s).ok())
    }

    /// Whether this response is still fresh under `max_age`, evaluated
    /// against `now`. A response with no readable or parseable `Date`
    /// header is always fresh (§4.G).
    pub fn is_fresh(&self, max_age: Duration, now: SystemTime) -> bool {
        if !self.response_type.is_readable() {
            return true;
        }
        match self.parsed_date() {
            Some(date) => date + max_age >= now,
            None => true,
        }
    }
}

mod header_map_serde {
    use http::{HeaderMap, HeaderName, HeaderValue};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        headers: &HeaderMap,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let pairs: Vec<(String, String)> = headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        pairs.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HeaderMap, D::Error> {
        let pairs = Vec::<(String, String)>::deserialize(deserializer)?;
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            if let (Ok(name), Ok(value)) = (
                HeaderName::try_from(name.as_str()),
                HeaderValue::from_str(&value),
            ) {
                headers.append(name, value);
            }
        }
        Ok(headers)
    }
}
