//! Infrastructure layer for the usage relay
//!
//! Implementations for external concerns: delivering audit events to the
//! broker, tracing setup, and shared log messages.

#[cfg(feature = "kafka")]
pub mod kafka;
pub mod log_messages;
pub mod log_sink;
pub mod publisher;
pub mod rest_proxy;
pub mod telemetry;

#[cfg(feature = "kafka")]
pub use kafka::KafkaSink;
pub use log_sink::LogSink;
pub use publisher::{
    BrokerRecord, EventPublisher, PublishError, PublisherHandle, QueueCapacity, QueuedPublisher,
    RecordSink,
};
pub use rest_proxy::RestProxySink;
