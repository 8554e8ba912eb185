//! HTTP header constants and filtering rules for the proxy service
//!
//! Centralizes which inbound headers are consumed, which are dropped and
//! which pass through, so the interceptor and the relay agree.

use ::http::header::{self, HeaderMap, HeaderName};

/// Default header carrying the caller's credential
pub const X_API_KEY: &str = "x-api-key";

/// Request headers the outbound HTTP client regenerates
static TRANSPORT_MANAGED: [HeaderName; 4] = [
    header::HOST,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::CONNECTION,
];

/// Response headers scoped to the upstream connection
static HOP_BY_HOP: [HeaderName; 3] = [
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    HeaderName::from_static("keep-alive"),
];

/// What happens to an inbound request header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderDisposition {
    /// The caller's credential: recorded for attribution, not forwarded
    CallerKey,
    /// Not forwarded upstream
    Drop,
    /// Copied verbatim to the outbound request
    Forward,
}

/// Classify an inbound request header. `HeaderName` is always lowercase so
/// the comparison ignores the casing used on the wire.
pub fn classify_request_header(
    name: &HeaderName,
    caller_key_header: &HeaderName,
) -> HeaderDisposition {
    if name == caller_key_header {
        HeaderDisposition::CallerKey
    } else if *name == header::ACCEPT_ENCODING || TRANSPORT_MANAGED.contains(name) {
        // The client must receive the upstream encoding untouched
        HeaderDisposition::Drop
    } else {
        HeaderDisposition::Forward
    }
}

/// Copy upstream response headers for the client, minus hop-by-hop ones
pub fn filter_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if !HOP_BY_HOP.contains(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::http::HeaderValue;
    use rstest::rstest;

    fn caller_key_header() -> HeaderName {
        HeaderName::from_static(X_API_KEY)
    }

    #[rstest]
    #[case("x-api-key", HeaderDisposition::CallerKey)]
    #[case("X-Api-Key", HeaderDisposition::CallerKey)]
    #[case("X-API-KEY", HeaderDisposition::CallerKey)]
    #[case("accept-encoding", HeaderDisposition::Drop)]
    #[case("Accept-Encoding", HeaderDisposition::Drop)]
    #[case("host", HeaderDisposition::Drop)]
    #[case("content-length", HeaderDisposition::Drop)]
    #[case("transfer-encoding", HeaderDisposition::Drop)]
    #[case("connection", HeaderDisposition::Drop)]
    #[case("authorization", HeaderDisposition::Forward)]
    #[case("content-type", HeaderDisposition::Forward)]
    #[case("openai-organization", HeaderDisposition::Forward)]
    fn test_request_header_classification(
        #[case] name: &str,
        #[case] expected: HeaderDisposition,
    ) {
        let name = HeaderName::from_bytes(name.as_bytes()).unwrap();
        assert_eq!(classify_request_header(&name, &caller_key_header()), expected);
    }

    #[test]
    fn test_custom_caller_key_header() {
        let custom = HeaderName::from_static("x-caller-id");
        assert_eq!(
            classify_request_header(&custom, &custom),
            HeaderDisposition::CallerKey
        );
        assert_eq!(
            classify_request_header(&caller_key_header(), &custom),
            HeaderDisposition::Forward
        );
    }

    #[test]
    fn test_response_filter_keeps_repeated_values_and_drops_hop_by_hop() {
        let mut upstream = HeaderMap::new();
        upstream.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        upstream.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));
        upstream.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        upstream.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        upstream.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        upstream.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        upstream.insert("keep-alive", HeaderValue::from_static("timeout=5"));

        let filtered = filter_response_headers(&upstream);

        let cookies: Vec<_> = filtered.get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
        assert_eq!(filtered[header::CONTENT_ENCODING], "gzip");
        assert!(!filtered.contains_key(header::TRANSFER_ENCODING));
        assert!(!filtered.contains_key(header::CONNECTION));
        assert!(!filtered.contains_key("keep-alive"));
    }
}
