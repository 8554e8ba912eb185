//! Request interception: buffer the body once, split identity from headers

use crate::infrastructure::log_messages::relay as messages;
use crate::providers::constants::json_fields;
use crate::proxy::headers::{classify_request_header, HeaderDisposition};
use crate::proxy::types::*;
use axum::body::Body;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, Request};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use tracing::warn;

/// Turns an inbound request into the captured call and its upstream twin
#[derive(Clone, Debug)]
pub struct RequestInterceptor {
    caller_key_header: HeaderName,
    max_request_size: RequestSizeLimit,
}

impl RequestInterceptor {
    pub fn new(config: &ProxyConfig) -> Self {
        Self {
            caller_key_header: config.caller_key_header.clone(),
            max_request_size: config.max_request_size,
        }
    }

    /// Read the body exactly once and derive both views of the call
    pub async fn intercept(
        &self,
        request: Request<Body>,
    ) -> ProxyResult<(InboundCall, OutboundCall)> {
        let received_at_millis = chrono::Utc::now().timestamp_millis();
        let (parts, body) = request.into_parts();

        let raw_body = self.read_body(body).await?;
        let (outbound_headers, caller_key) =
            filter_headers(&parts.headers, &self.caller_key_header);
        let subject_user_id = extract_subject_user_id(&raw_body);

        let outbound = OutboundCall {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: outbound_headers,
            body: raw_body.clone(),
        };

        let inbound = InboundCall {
            method: parts.method,
            path: parts.uri.path().to_string(),
            headers: parts.headers,
            raw_body,
            caller_key,
            subject_user_id,
            received_at_millis,
        };

        Ok((inbound, outbound))
    }

    async fn read_body(&self, body: Body) -> ProxyResult<Bytes> {
        let limit = *self.max_request_size.as_ref();

        match Limited::new(body, limit).collect().await {
            Ok(collected) => Ok(collected.to_bytes()),
            Err(e) if e.is::<LengthLimitError>() => {
                warn!(max_size = limit, "{}", messages::REQUEST_TOO_LARGE);
                Err(ProxyError::RequestTooLarge {
                    max_size: self.max_request_size,
                })
            }
            Err(e) => {
                let error = error_chain(e.as_ref());
                warn!(error = %error, "{}", messages::BODY_READ_FAILED);
                Err(ProxyError::BodyRead(error))
            }
        }
    }
}

/// Split inbound headers into the outbound set and the caller key
///
/// Repeated headers keep their order. When the caller-key header repeats,
/// the last value wins. A missing caller-key header yields an empty key.
pub fn filter_headers(
    headers: &HeaderMap,
    caller_key_header: &HeaderName,
) -> (HeaderMap, CallerKey) {
    let mut outbound = HeaderMap::with_capacity(headers.len());
    let mut caller_key = String::new();

    for (name, value) in headers {
        match classify_request_header(name, caller_key_header) {
            HeaderDisposition::CallerKey => {
                caller_key = String::from_utf8_lossy(value.as_bytes()).into_owned();
            }
            HeaderDisposition::Drop => {}
            HeaderDisposition::Forward => {
                outbound.append(name.clone(), value.clone());
            }
        }
    }

    (outbound, CallerKey::from(caller_key))
}

/// Top-level string `user` of a JSON object body, otherwise empty
pub fn extract_subject_user_id(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .as_ref()
        .and_then(|value| value.get(json_fields::USER))
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}
