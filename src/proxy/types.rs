//! Type definitions for the proxy module

use crate::proxy::streaming::CapturedBody;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, Method, StatusCode, Uri};
use nutype::nutype;
use std::time::Duration;
use thiserror::Error;

// ========== Configuration Types ==========

/// Maximum size for inbound request bodies in bytes
#[nutype(
    derive(Clone, Copy, Debug, Display, TryFrom, AsRef),
    validate(predicate = |size: &usize| *size > 0),
)]
pub struct RequestSizeLimit(usize);

/// Base URL every request path is appended to, e.g. `https://api.openai.com/v1`
#[nutype(
    sanitize(trim),
    derive(Clone, Debug, Display, TryFrom, AsRef),
    validate(predicate = |s: &str| is_upstream_base(s)),
)]
pub struct UpstreamBaseUrl(String);

/// An absolute http(s) URL with a host and nothing after the path, so that
/// appending an inbound path always yields a parseable URL
fn is_upstream_base(s: &str) -> bool {
    (s.starts_with("http://") || s.starts_with("https://"))
        && reqwest::Url::parse(s).is_ok_and(|url| {
            url.has_host() && url.query().is_none() && url.fragment().is_none()
        })
}

/// Value of the caller-key header. Used for attribution only, may be empty.
#[nutype(derive(Clone, Debug, Display, PartialEq, Eq, From, AsRef))]
pub struct CallerKey(String);

impl CallerKey {
    pub fn is_empty(&self) -> bool {
        self.as_ref().is_empty()
    }
}

/// Proxy configuration
#[derive(Clone, Debug)]
pub struct ProxyConfig {
    /// Where requests are forwarded to
    pub upstream_base_url: UpstreamBaseUrl,
    /// Header carrying the caller's credential; consumed, never forwarded
    pub caller_key_header: HeaderName,
    /// Maximum request size in bytes
    pub max_request_size: RequestSizeLimit,
    /// Upstream request timeout, covering the whole response
    pub request_timeout: Duration,
    /// Publish request and response bodies
    pub log_content: bool,
}

// ========== Per-call Types ==========

/// The inbound request, captured once and never mutated
#[derive(Clone, Debug)]
pub struct InboundCall {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub raw_body: Bytes,
    pub caller_key: CallerKey,
    /// Top-level `user` field of a JSON body, empty when absent
    pub subject_user_id: String,
    pub received_at_millis: i64,
}

/// The request as it will be sent upstream
#[derive(Clone, Debug)]
pub struct OutboundCall {
    pub method: Method,
    /// Inbound path and query, appended to the upstream base on dispatch
    pub uri: Uri,
    pub headers: HeaderMap,
    /// Shares its buffer with [`InboundCall::raw_body`]
    pub body: Bytes,
}

/// What the upstream answered, with the bytes the client was sent
#[derive(Clone, Debug)]
pub struct UpstreamResult {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: CapturedBody,
    pub received_at_millis: i64,
}

/// Errors that can occur on the critical path of a call
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    #[error("Request too large (max: {max_size} bytes)")]
    RequestTooLarge { max_size: RequestSizeLimit },

    #[error("Invalid upstream URL: {0}")]
    InvalidUpstreamUrl(String),

    #[error("Request path contains dot segments: {0}")]
    InvalidRequestPath(String),

    #[error("Upstream request failed: {0}")]
    UpstreamDispatch(String),

    #[error("Failed to build response: {0}")]
    ResponseBuild(#[from] http::Error),
}

/// Result type for proxy operations
pub type ProxyResult<T> = Result<T, ProxyError>;

/// Render an error with all of its sources, `outer: inner: root`
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        // reqwest and hyper often repeat the inner message in the outer one
        if !rendered.ends_with(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }
    rendered
}
