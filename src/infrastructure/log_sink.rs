//! Sink that writes records to the local tracing output
//!
//! Used when no broker is configured, e.g. local development.

use crate::infrastructure::log_messages::publisher as messages;
use crate::infrastructure::publisher::{BrokerRecord, PublishError, RecordSink};
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl RecordSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, record: &BrokerRecord) -> Result<(), PublishError> {
        info!(
            topic = %record.topic,
            key = %record.key,
            payload = %String::from_utf8_lossy(&record.payload),
            "{}",
            messages::LOGGED
        );
        Ok(())
    }
}
