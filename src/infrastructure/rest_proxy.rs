//! Kafka REST proxy sink
//!
//! Produces each record through the REST proxy's v2 binary embedded format:
//! `POST {base}/topics/{topic}` with base64 key and value. Cluster API
//! credentials are sent as HTTP basic auth.

use crate::infrastructure::publisher::{BrokerRecord, PublishError, RecordSink};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use http::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use std::time::Duration;

pub const KAFKA_BINARY_V2: &str = "application/vnd.kafka.binary.v2+json";
pub const KAFKA_V2: &str = "application/vnd.kafka.v2+json";

#[derive(Serialize)]
struct ProduceRequest<'a> {
    records: [ProduceRecord<'a>; 1],
}

#[derive(Serialize)]
struct ProduceRecord<'a> {
    key: &'a str,
    value: &'a str,
}

#[derive(Debug, Clone)]
struct Credentials {
    username: String,
    password: String,
}

/// Delivers records to a Kafka REST proxy over HTTPS
#[derive(Debug, Clone)]
pub struct RestProxySink {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<Credentials>,
}

impl RestProxySink {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        api_secret: Option<String>,
        timeout: Duration,
    ) -> Result<Self, PublishError> {
        let base_url = base_url.into();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(PublishError::Misconfigured(format!(
                "REST proxy URL must be http(s): {base_url}"
            )));
        }

        let credentials = match (api_key, api_secret) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            (None, None) => None,
            _ => {
                return Err(PublishError::Misconfigured(
                    "api_key and api_secret must be set together".to_string(),
                ))
            }
        };

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn topic_url(&self, record: &BrokerRecord) -> String {
        format!("{}/topics/{}", self.base_url, record.topic)
    }

    fn encode(record: &BrokerRecord) -> Result<Vec<u8>, PublishError> {
        let key = BASE64.encode(record.key.as_bytes());
        let value = BASE64.encode(&record.payload);
        let request = ProduceRequest {
            records: [ProduceRecord {
                key: &key,
                value: &value,
            }],
        };

        Ok(serde_json::to_vec(&request)?)
    }
}

#[async_trait]
impl RecordSink for RestProxySink {
    fn name(&self) -> &'static str {
        "kafka-rest-proxy"
    }

    async fn deliver(&self, record: &BrokerRecord) -> Result<(), PublishError> {
        let mut request = self
            .client
            .post(self.topic_url(record))
            .header(CONTENT_TYPE, KAFKA_BINARY_V2)
            .header(ACCEPT, KAFKA_V2)
            .body(Self::encode(record)?);

        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.username, Some(&credentials.password));
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(PublishError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
