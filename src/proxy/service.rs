//! Main proxy service implementation
//!
//! The `ProxyService` ties the three stages of a call together: the
//! interceptor reads the request once, the hot path relays it and streams
//! the answer back, and the audit path publishes records off to the side.
//!
//! ## Service Lifecycle
//!
//! ```rust,ignore
//! use usage_relay::proxy::ProxyService;
//!
//! // 1. Create service with configuration and a publisher
//! let service = ProxyService::new(proxy_config, publisher)?;
//!
//! // 2. Convert to Axum router
//! let router = service.into_router();
//!
//! // 3. Serve with Axum
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use crate::infrastructure::publisher::EventPublisher;
use crate::proxy::audit_path::AuditPipeline;
use crate::proxy::error_response::ErrorResponseExt;
use crate::proxy::hot_path::StreamingHotPathService;
use crate::proxy::interceptor::RequestInterceptor;
use crate::proxy::middleware::logging_middleware;
use crate::proxy::types::*;
use axum::{
    body::Body,
    extract::{Request, State},
    middleware::from_fn,
    response::{IntoResponse, Response},
    Router,
};
use std::sync::Arc;

/// Main proxy service combining interception, relay and auditing
pub struct ProxyService {
    interceptor: RequestInterceptor,
    hot_path: StreamingHotPathService,
    audit: AuditPipeline,
}

impl ProxyService {
    /// Create a new proxy service. The publisher is shared by all calls.
    pub fn new(config: ProxyConfig, publisher: Arc<dyn EventPublisher>) -> crate::Result<Self> {
        Ok(Self {
            interceptor: RequestInterceptor::new(&config),
            hot_path: StreamingHotPathService::new(&config)?,
            audit: AuditPipeline::new(publisher, config.log_content),
        })
    }

    /// Proxy one call. Returns as soon as upstream headers are in; response
    /// and usage records are published after the body has streamed.
    pub async fn handle(&self, request: Request<Body>) -> ProxyResult<Response> {
        let (inbound, outbound) = self.interceptor.intercept(request).await?;

        // Emitted regardless of how the dispatch turns out
        self.audit.record_request(&inbound);

        let relayed = self.hot_path.relay(outbound).await?;
        self.audit.record_completion(inbound, relayed.pending);

        Ok(relayed.response)
    }

    /// Create an Axum router that proxies every method and path
    pub fn into_router(self) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(Arc::new(self))
            .layer(from_fn(logging_middleware))
    }
}

/// Axum handler for proxying requests
async fn proxy_handler(
    State(proxy): State<Arc<ProxyService>>,
    request: Request<Body>,
) -> Result<Response, ProxyError> {
    proxy.handle(request).await
}

/// Error conversion for Axum responses using standardized format
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = self.to_error_response();
        error_response.into_response_with_status(status)
    }
}
