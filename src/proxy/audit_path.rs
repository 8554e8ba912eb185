//! Audit path: turn a finished call into request, response and usage records
//!
//! Nothing here can fail a call. Records are serialized and handed to the
//! [`EventPublisher`], which never blocks; serialization problems are logged
//! and the record is skipped.

use crate::domain::{AuditRecord, RequestLog, ResponseLog, UsageLog};
use crate::infrastructure::log_messages::audit as messages;
use crate::infrastructure::publisher::EventPublisher;
use crate::providers::{UsageEndpoint, UsageExtractor, UsageRecord};
use crate::proxy::hot_path::PendingUpstreamResult;
use crate::proxy::types::*;
use bytes::Bytes;
use chrono::Utc;
use http::header::CONTENT_TYPE;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Builds audit records for a call and publishes them
#[derive(Clone)]
pub struct AuditPipeline {
    publisher: Arc<dyn EventPublisher>,
    log_content: bool,
}

impl AuditPipeline {
    /// `log_content` controls request and response records; usage is always
    /// published because it feeds billing.
    pub fn new(publisher: Arc<dyn EventPublisher>, log_content: bool) -> Self {
        Self {
            publisher,
            log_content,
        }
    }

    /// Publish the request record. Called before the call is dispatched.
    pub fn record_request(&self, call: &InboundCall) {
        if !self.log_content {
            return;
        }

        let record = RequestLog {
            account_id: call.caller_key.to_string(),
            user_id: call.subject_user_id.clone(),
            path: call.path.clone(),
            method: call.method.to_string(),
            body: String::from_utf8_lossy(&call.raw_body).into_owned(),
            sent_at: Utc::now().timestamp(),
        };
        self.emit(&call.caller_key, &record);
    }

    /// Publish response and usage records once the client stream is done,
    /// without holding up the response itself
    pub fn record_completion(
        &self,
        call: InboundCall,
        pending: PendingUpstreamResult,
    ) -> JoinHandle<()> {
        let pipeline = self.clone();

        tokio::spawn(async move {
            let result = pending.into_result().await;
            pipeline.record_outcome(&call, &result);
        })
    }

    /// Publish the response record and, for completion calls, the usage record
    pub fn record_outcome(&self, call: &InboundCall, result: &UpstreamResult) {
        debug!(
            method = %call.method,
            path = %call.path,
            status = result.status.as_u16(),
            request_content_type = ?call.headers.get(CONTENT_TYPE),
            response_content_type = ?result.headers.get(CONTENT_TYPE),
            time_to_headers_ms = result.received_at_millis - call.received_at_millis,
            complete = result.body.is_complete(),
            "{}",
            messages::OUTCOME_CAPTURED
        );

        let bills_usage = UsageEndpoint::matches(&call.method, &call.path);
        if !self.log_content && !bills_usage {
            return;
        }

        let usage = UsageExtractor::extract(result.body.bytes());

        if self.log_content {
            self.record_response(call, result, &usage);
        }
        if bills_usage {
            self.record_usage(call, &usage);
        }
    }

    fn record_response(&self, call: &InboundCall, result: &UpstreamResult, usage: &UsageRecord) {
        let record = ResponseLog {
            id: usage.completion_id.clone(),
            account_id: call.caller_key.to_string(),
            user_id: call.subject_user_id.clone(),
            path: call.path.clone(),
            method: call.method.to_string(),
            body: String::from_utf8_lossy(result.body.bytes()).into_owned(),
            status_code: result.status.as_u16(),
            sent_at: Utc::now().timestamp(),
        };
        self.emit(&call.caller_key, &record);
    }

    fn record_usage(&self, call: &InboundCall, usage: &UsageRecord) {
        let record = UsageLog {
            id: usage.completion_id.clone(),
            account_id: call.caller_key.to_string(),
            user_id: call.subject_user_id.clone(),
            model: usage.model.clone(),
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            created_time: usage.created_at_epoch_seconds,
            latency: Utc::now().timestamp_millis() - call.received_at_millis,
        };
        self.emit(&call.caller_key, &record);
    }

    fn emit<R: AuditRecord>(&self, key: &CallerKey, record: &R) {
        match serde_json::to_vec(record) {
            Ok(payload) => {
                self.publisher.publish(key.as_ref(), Bytes::from(payload), R::TOPIC);
                debug!(topic = %R::TOPIC, "{}", messages::EMITTED);
            }
            Err(e) => warn!(
                topic = %R::TOPIC,
                error = %e,
                "{}",
                messages::SERIALIZATION_FAILED
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Topic;
    use crate::proxy::streaming::CapturedBody;
    use crate::proxy::test_utils::RecordingPublisher;
    use http::{HeaderMap, Method, StatusCode};
    use serde_json::{json, Value};

    const COMPLETION: &str = r#"{"id":"cmpl-1","model":"gpt-x","usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15},"created":1700000000}"#;

    fn call(method: Method, path: &str, body: &'static str) -> InboundCall {
        InboundCall {
            method,
            path: path.to_string(),
            headers: HeaderMap::new(),
            raw_body: Bytes::from_static(body.as_bytes()),
            caller_key: CallerKey::from("abc123".to_string()),
            subject_user_id: "u1".to_string(),
            received_at_millis: Utc::now().timestamp_millis(),
        }
    }

    fn result(status: StatusCode, body: CapturedBody) -> UpstreamResult {
        UpstreamResult {
            status,
            headers: HeaderMap::new(),
            body,
            received_at_millis: Utc::now().timestamp_millis(),
        }
    }

    fn pipeline(log_content: bool) -> (AuditPipeline, RecordingPublisher) {
        let publisher = RecordingPublisher::default();
        (
            AuditPipeline::new(Arc::new(publisher.clone()), log_content),
            publisher,
        )
    }

    fn payload(record: &crate::infrastructure::BrokerRecord) -> Value {
        serde_json::from_slice(&record.payload).unwrap()
    }

    #[test]
    fn test_request_record_carries_identity_and_body() {
        let (pipeline, publisher) = pipeline(true);
        let call = call(Method::POST, "/chat/completions", r#"{"user":"u1"}"#);

        pipeline.record_request(&call);

        let records = publisher.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].topic, Topic::Requests);
        assert_eq!(records[0].key, "abc123");

        let body = payload(&records[0]);
        assert_eq!(body["account_id"], "abc123");
        assert_eq!(body["user"], "u1");
        assert_eq!(body["method"], "POST");
        assert_eq!(body["path"], "/chat/completions");
        assert_eq!(body["body"], r#"{"user":"u1"}"#);
        assert!(body["sent_at"].as_i64().unwrap() > 1_700_000_000);
    }

    #[test]
    fn test_completion_emits_response_then_usage() {
        let (pipeline, publisher) = pipeline(true);
        let call = call(Method::POST, "/chat/completions", "{}");
        let upstream = result(
            StatusCode::OK,
            CapturedBody::Complete(Bytes::from_static(COMPLETION.as_bytes())),
        );

        pipeline.record_outcome(&call, &upstream);

        let records = publisher.records();
        assert_eq!(publisher.topics(), vec![Topic::Responses, Topic::Usage]);

        let response = payload(&records[0]);
        assert_eq!(response["id"], "cmpl-1");
        assert_eq!(response["status_code"], 200);
        assert_eq!(response["body"], COMPLETION);
        assert_eq!(response["user_id"], "u1");

        let usage = payload(&records[1]);
        assert_eq!(
            usage,
            json!({
                "id": "cmpl-1",
                "account_id": "abc123",
                "user_id": "u1",
                "model": "gpt-x",
                "input_tokens": 10,
                "output_tokens": 5,
                "created_time": 1_700_000_000,
                "latency": usage["latency"].clone(),
            })
        );
        assert!(usage["latency"].as_i64().unwrap() >= 0);
    }

    #[test]
    fn test_non_completion_call_never_emits_usage() {
        let (pipeline, publisher) = pipeline(true);
        let call = call(Method::GET, "/models", "");
        // Even a body that looks like a completion must not be billed
        let upstream = result(
            StatusCode::OK,
            CapturedBody::Complete(Bytes::from_static(COMPLETION.as_bytes())),
        );

        pipeline.record_outcome(&call, &upstream);

        assert_eq!(publisher.topics(), vec![Topic::Responses]);
    }

    #[test]
    fn test_undecodable_completion_still_emits_zero_usage() {
        let (pipeline, publisher) = pipeline(true);
        let call = call(Method::POST, "/chat/completions", "{}");
        let upstream = result(
            StatusCode::BAD_GATEWAY,
            CapturedBody::Complete(Bytes::from_static(b"<html>Bad Gateway</html>")),
        );

        pipeline.record_outcome(&call, &upstream);

        let records = publisher.records();
        assert_eq!(publisher.topics(), vec![Topic::Responses, Topic::Usage]);
        assert_eq!(payload(&records[0])["status_code"], 502);
        let usage = payload(&records[1]);
        assert_eq!(usage["input_tokens"], 0);
        assert_eq!(usage["output_tokens"], 0);
        assert_eq!(usage["model"], "");
    }

    #[test]
    fn test_content_logging_disabled_keeps_usage_only() {
        let (pipeline, publisher) = pipeline(false);
        let call = call(Method::POST, "/chat/completions", "{}");
        let upstream = result(
            StatusCode::OK,
            CapturedBody::Complete(Bytes::from_static(COMPLETION.as_bytes())),
        );

        pipeline.record_request(&call);
        pipeline.record_outcome(&call, &upstream);

        assert_eq!(publisher.topics(), vec![Topic::Usage]);
    }

    #[test]
    fn test_partial_body_is_logged_as_captured() {
        let (pipeline, publisher) = pipeline(true);
        let call = call(Method::POST, "/chat/completions", "{}");
        let upstream = result(
            StatusCode::OK,
            CapturedBody::Partial(Bytes::from_static(b"{\"id\":\"cmpl-1\",")),
        );

        pipeline.record_outcome(&call, &upstream);

        let records = publisher.records();
        assert_eq!(payload(&records[0])["body"], "{\"id\":\"cmpl-1\",");
        assert_eq!(payload(&records[1])["input_tokens"], 0);
    }
}
