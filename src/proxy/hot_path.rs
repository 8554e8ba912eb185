//! Hot path: forward the call upstream and stream the answer back
//!
//! The client response is built as soon as upstream headers arrive. The body
//! streams through a [`CapturingStream`], and the captured copy reaches the
//! audit path through [`PendingUpstreamResult`] once streaming has ended.

use crate::infrastructure::log_messages::relay as messages;
use crate::proxy::headers::filter_response_headers;
use crate::proxy::streaming::{CapturedBody, CapturingStream};
use crate::proxy::types::*;
use crate::proxy::url_resolver::UrlResolver;
use axum::body::Body;
use bytes::Bytes;
use http::{HeaderMap, Response, StatusCode};
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

/// Upstream client shared by every in-flight call
#[derive(Clone, Debug)]
pub struct StreamingHotPathService {
    client: reqwest::Client,
    upstream_base_url: UpstreamBaseUrl,
}

/// The client-facing response plus the audit half still being captured
pub struct RelayedResponse {
    pub response: Response<Body>,
    pub pending: PendingUpstreamResult,
}

/// Upstream status and headers, waiting for the captured body
pub struct PendingUpstreamResult {
    status: StatusCode,
    headers: HeaderMap,
    received_at_millis: i64,
    body: oneshot::Receiver<CapturedBody>,
}

impl PendingUpstreamResult {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Wait until the client stream has finished, however it finished
    pub async fn into_result(self) -> UpstreamResult {
        let body = self.body.await.unwrap_or_else(|_| {
            warn!("{}", messages::CAPTURE_LOST);
            CapturedBody::Partial(Bytes::new())
        });

        UpstreamResult {
            status: self.status,
            headers: self.headers,
            body,
            received_at_millis: self.received_at_millis,
        }
    }
}

impl StreamingHotPathService {
    /// Build the upstream client. Redirects are relayed to the caller, not
    /// followed, and responses are never decompressed.
    pub fn new(config: &ProxyConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            upstream_base_url: config.upstream_base_url.clone(),
        })
    }

    /// Send the call upstream. Fails only when no response was received.
    pub async fn relay(&self, outbound: OutboundCall) -> ProxyResult<RelayedResponse> {
        let start_time = Instant::now();
        let OutboundCall {
            method,
            uri,
            headers,
            body,
        } = outbound;

        let url = UrlResolver::resolve_upstream_url(&self.upstream_base_url, &uri)
            .inspect_err(|e| {
                warn!(method = %method, uri = %uri, error = %e, "{}", messages::UNRESOLVABLE_URL);
            })?;

        let upstream = self
            .client
            .request(method.clone(), url.clone())
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                let error = error_chain(&e);
                error!(
                    method = %method,
                    url = %url,
                    error = %error,
                    "{}",
                    messages::DISPATCH_FAILED
                );
                ProxyError::UpstreamDispatch(error)
            })?;

        let status = upstream.status();
        let headers = upstream.headers().clone();
        let received_at_millis = chrono::Utc::now().timestamp_millis();

        debug!(
            method = %method,
            url = %url,
            status = status.as_u16(),
            duration_ms = start_time.elapsed().as_millis(),
            "{}",
            messages::UPSTREAM_RESPONDED
        );

        let (stream, captured) = CapturingStream::new(upstream.bytes_stream());

        let mut builder = Response::builder().status(status);
        if let Some(client_headers) = builder.headers_mut() {
            *client_headers = filter_response_headers(&headers);
        }
        let response = builder.body(Body::from_stream(stream))?;

        Ok(RelayedResponse {
            response,
            pending: PendingUpstreamResult {
                status,
                headers,
                received_at_millis,
                body: captured,
            },
        })
    }
}
