//! Best-effort event publishing
//!
//! Request handlers call [`EventPublisher::publish`] and move on. The
//! [`QueuedPublisher`] puts the record on a bounded queue and a single
//! dispatcher task hands records to a [`RecordSink`] one at a time, so
//! records for one call leave in the order they were published. A full
//! queue, a closed queue, or a failed delivery is logged and the record is
//! dropped.

use crate::domain::Topic;
use crate::infrastructure::log_messages::publisher as messages;
use async_trait::async_trait;
use bytes::Bytes;
use nutype::nutype;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Fire-and-forget publishing capability shared by all in-flight calls
pub trait EventPublisher: Send + Sync {
    /// Hand a payload to the broker, keyed for partitioning. Never blocks and
    /// never reports failure to the caller.
    fn publish(&self, key: &str, payload: Bytes, topic: Topic);
}

/// A record on its way to the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerRecord {
    pub key: String,
    pub payload: Bytes,
    pub topic: Topic,
}

/// Errors raised while publishing. They never leave the publisher.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Publish queue is full")]
    QueueFull,

    #[error("Publish queue is closed")]
    Closed,

    #[error("Broker transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Broker rejected record with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Broker did not acknowledge record: {0}")]
    Delivery(String),

    #[error("Failed to encode record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Publisher misconfigured: {0}")]
    Misconfigured(String),
}

/// Destination the dispatcher delivers records to
#[async_trait]
pub trait RecordSink: Send + Sync + 'static {
    /// Short name used in log lines
    fn name(&self) -> &'static str;

    async fn deliver(&self, record: &BrokerRecord) -> Result<(), PublishError>;
}

/// Number of records that may wait for delivery
#[nutype(
    validate(predicate = |capacity: &usize| *capacity > 0),
    derive(Clone, Copy, Debug, Display, TryFrom, AsRef)
)]
pub struct QueueCapacity(usize);

/// Cloneable handle that enqueues records for the dispatcher
#[derive(Clone, Debug)]
pub struct QueuedPublisher {
    tx: mpsc::Sender<BrokerRecord>,
}

/// Owner of the dispatcher task, used to drain the queue on shutdown
#[derive(Debug)]
pub struct PublisherHandle {
    join: JoinHandle<()>,
}

impl PublisherHandle {
    /// Wait for the dispatcher to deliver what is queued. Every
    /// [`QueuedPublisher`] clone must be dropped first, otherwise this waits
    /// for the full `grace` period.
    pub async fn shutdown(self, grace: Duration) {
        match tokio::time::timeout(grace, self.join).await {
            Ok(Ok(())) => info!("{}", messages::DRAINED),
            Ok(Err(e)) => warn!(error = %e, "{}", messages::DISPATCHER_FAILED),
            Err(_) => warn!(grace_ms = grace.as_millis(), "{}", messages::DRAIN_TIMED_OUT),
        }
    }
}

impl QueuedPublisher {
    /// Start a dispatcher task draining into `sink`. Must be called from
    /// within a tokio runtime.
    pub fn spawn<K: RecordSink>(sink: K, capacity: QueueCapacity) -> (Self, PublisherHandle) {
        let (tx, rx) = mpsc::channel(*capacity.as_ref());
        let join = tokio::spawn(dispatch(Arc::new(sink), rx));

        (Self { tx }, PublisherHandle { join })
    }

    /// Enqueue a record without waiting
    pub fn try_enqueue(&self, record: BrokerRecord) -> Result<(), PublishError> {
        self.tx.try_send(record).map_err(|e| match e {
            TrySendError::Full(_) => PublishError::QueueFull,
            TrySendError::Closed(_) => PublishError::Closed,
        })
    }
}

impl EventPublisher for QueuedPublisher {
    fn publish(&self, key: &str, payload: Bytes, topic: Topic) {
        let record = BrokerRecord {
            key: key.to_string(),
            payload,
            topic,
        };

        if let Err(e) = self.try_enqueue(record) {
            warn!(topic = %topic, error = %e, "{}", messages::RECORD_DROPPED);
        }
    }
}

async fn dispatch<K: RecordSink>(sink: Arc<K>, mut rx: mpsc::Receiver<BrokerRecord>) {
    info!(sink = sink.name(), "{}", messages::DISPATCHER_STARTED);

    while let Some(record) = rx.recv().await {
        match sink.deliver(&record).await {
            Ok(()) => debug!(
                sink = sink.name(),
                topic = %record.topic,
                bytes = record.payload.len(),
                "{}",
                messages::DELIVERED
            ),
            Err(e) => warn!(
                sink = sink.name(),
                topic = %record.topic,
                error = %e,
                "{}",
                messages::DELIVERY_FAILED
            ),
        }
    }

    info!(sink = sink.name(), "{}", messages::DISPATCHER_STOPPED);
}
