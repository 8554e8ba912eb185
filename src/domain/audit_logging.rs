//! Audit records published for every proxied call
//!
//! Three flat records describe a call: what the caller sent, what the
//! upstream answered, and how many tokens that cost. Field names are the
//! wire format consumed downstream of the broker, so they stay snake_case
//! and stable even where the Rust names differ.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broker topic an audit record is published to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Requests,
    Responses,
    Usage,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requests => "requests",
            Self::Responses => "responses",
            Self::Usage => "usage",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record with a fixed destination topic
pub trait AuditRecord: Serialize {
    const TOPIC: Topic;
}

/// Snapshot of an inbound request, taken before it is forwarded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLog {
    pub account_id: String,
    #[serde(rename = "user")]
    pub user_id: String,
    pub path: String,
    pub method: String,
    pub body: String,
    /// Unix seconds
    pub sent_at: i64,
}

impl AuditRecord for RequestLog {
    const TOPIC: Topic = Topic::Requests;
}

/// Snapshot of the upstream response as delivered to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseLog {
    /// Completion ID declared by the upstream, empty when absent
    pub id: String,
    pub account_id: String,
    pub user_id: String,
    pub path: String,
    pub method: String,
    pub body: String,
    pub status_code: u16,
    /// Unix seconds
    pub sent_at: i64,
}

impl AuditRecord for ResponseLog {
    const TOPIC: Topic = Topic::Responses;
}

/// Token accounting for a single completion call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLog {
    pub id: String,
    pub account_id: String,
    pub user_id: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Upstream-declared creation time, Unix seconds
    pub created_time: i64,
    /// Wall-clock milliseconds from request receipt to usage accounting
    pub latency: i64,
}

impl AuditRecord for UsageLog {
    const TOPIC: Topic = Topic::Usage;
}
