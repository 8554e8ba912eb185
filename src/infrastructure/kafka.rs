//! Native Kafka sink
//!
//! Produces each record straight to the cluster with `acks=all`. When API
//! credentials are configured the connection uses SASL_SSL with the PLAIN
//! mechanism, as managed Kafka offerings expect.

use crate::infrastructure::publisher::{BrokerRecord, PublishError, RecordSink};
use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use std::time::Duration;

/// Delivers records to Kafka through librdkafka
pub struct KafkaSink {
    producer: FutureProducer,
    delivery_timeout: Duration,
}

impl KafkaSink {
    pub fn new(
        bootstrap_servers: &str,
        api_key: Option<String>,
        api_secret: Option<String>,
        delivery_timeout: Duration,
    ) -> Result<Self, PublishError> {
        if bootstrap_servers.trim().is_empty() {
            return Err(PublishError::Misconfigured(
                "bootstrap_servers must not be empty".to_string(),
            ));
        }

        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", bootstrap_servers)
            .set("acks", "all")
            .set(
                "message.timeout.ms",
                delivery_timeout.as_millis().to_string(),
            );

        match (api_key, api_secret) {
            (Some(username), Some(password)) => {
                config
                    .set("security.protocol", "SASL_SSL")
                    .set("sasl.mechanisms", "PLAIN")
                    .set("sasl.username", username)
                    .set("sasl.password", password);
            }
            (None, None) => {}
            _ => {
                return Err(PublishError::Misconfigured(
                    "api_key and api_secret must be set together".to_string(),
                ))
            }
        }

        let producer = config
            .create()
            .map_err(|e| PublishError::Misconfigured(e.to_string()))?;

        Ok(Self {
            producer,
            delivery_timeout,
        })
    }
}

#[async_trait]
impl RecordSink for KafkaSink {
    fn name(&self) -> &'static str {
        "kafka"
    }

    async fn deliver(&self, record: &BrokerRecord) -> Result<(), PublishError> {
        let message = FutureRecord::to(record.topic.as_str())
            .key(record.key.as_str())
            .payload(record.payload.as_ref());

        self.producer
            .send(message, self.delivery_timeout)
            .await
            .map(|_| ())
            .map_err(|(e, _)| PublishError::Delivery(e.to_string()))
    }
}
