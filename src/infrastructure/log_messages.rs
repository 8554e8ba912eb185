//! Log message constants for infrastructure components
//!
//! This module centralizes the log messages used across the relay so that
//! operators can grep for them and wording stays consistent.

/// Application startup and lifecycle messages
pub mod application {
    pub const STARTING: &str = "Starting usage relay";
    pub const LISTENING: &str = "Usage relay listening";
    pub const SHUTDOWN_SIGNAL: &str = "Shutdown signal received, draining connections";
    pub const STOPPED: &str = "Usage relay stopped";
}

/// Request/response relay messages
pub mod relay {
    pub const REQUEST_COMPLETED: &str = "Request completed";
    pub const BODY_READ_FAILED: &str = "Failed to read inbound request body";
    pub const REQUEST_TOO_LARGE: &str = "Inbound request body exceeds the configured limit";
    pub const UNRESOLVABLE_URL: &str = "Refusing to build upstream URL";
    pub const DISPATCH_FAILED: &str = "Upstream dispatch failed";
    pub const UPSTREAM_RESPONDED: &str = "Upstream responded";
    pub const RESPONSE_STREAM_FAILED: &str = "Upstream response stream failed mid-body";
    pub const CAPTURE_LOST: &str = "Captured response body was never handed off";
}

/// Audit event emission messages
pub mod audit {
    pub const SERIALIZATION_FAILED: &str = "Failed to serialize audit record";
    pub const EMITTED: &str = "Audit record handed to publisher";
    pub const OUTCOME_CAPTURED: &str = "Upstream outcome captured";
    pub const NO_USAGE_DATA: &str = "Response body carries no usage data";
}

/// Event publisher messages
pub mod publisher {
    pub const DISPATCHER_STARTED: &str = "Event dispatcher started";
    pub const DISPATCHER_STOPPED: &str = "Event dispatcher stopped";
    pub const DISPATCHER_FAILED: &str = "Event dispatcher task failed";
    pub const DELIVERED: &str = "Event delivered";
    pub const DELIVERY_FAILED: &str = "Event delivery failed";
    pub const RECORD_DROPPED: &str = "Event dropped before delivery";
    pub const DRAINED: &str = "Event queue drained";
    pub const DRAIN_TIMED_OUT: &str = "Timed out draining event queue";
    pub const LOGGED: &str = "Audit event";
}
