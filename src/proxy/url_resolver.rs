//! Upstream URL resolution for proxied requests

use crate::proxy::types::*;
use http::Uri;

/// Strategy for composing the upstream URL from the configured base and the
/// inbound request path
pub struct UrlResolver;

impl UrlResolver {
    /// Resolve the final URL for the outgoing request
    ///
    /// The base URL (minus any trailing slash) is joined with the inbound path
    /// and query exactly as received. Path segments are never rewritten, so a
    /// base of `https://api.openai.com/v1` and a request for
    /// `/chat/completions` yields `https://api.openai.com/v1/chat/completions`.
    ///
    /// URL parsing collapses `.` and `..` segments, which would make the
    /// forwarded path differ from the one the call is audited under, so such
    /// paths are refused.
    pub fn resolve_upstream_url(
        base: &UpstreamBaseUrl,
        original_uri: &Uri,
    ) -> ProxyResult<reqwest::Url> {
        let path = original_uri.path();
        if path.split(['/', '\\']).any(is_dot_segment) {
            return Err(ProxyError::InvalidRequestPath(path.to_string()));
        }

        let path_and_query = original_uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        let url = format!("{}{}", base.as_ref().trim_end_matches('/'), path_and_query);

        reqwest::Url::parse(&url)
            .map_err(|e| ProxyError::InvalidUpstreamUrl(format!("{url}: {e}")))
    }
}

/// `.` or `..`, literally or percent-encoded
fn is_dot_segment(segment: &str) -> bool {
    matches!(
        segment.to_ascii_lowercase().as_str(),
        "." | ".." | "%2e" | ".%2e" | "%2e." | "%2e%2e"
    )
}
