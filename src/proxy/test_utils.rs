//! Test utilities for proxy module testing
//!
//! Configuration builders, a recording publisher and a throwaway upstream
//! server so components can be exercised without a network dependency.

use crate::domain::Topic;
use crate::infrastructure::publisher::{BrokerRecord, EventPublisher};
use crate::proxy::headers::X_API_KEY;
use crate::proxy::types::*;
use axum::Router;
use bytes::Bytes;
use http::HeaderName;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Proxy configuration pointed at `base_url` with test-friendly limits
pub fn test_config(base_url: &str) -> ProxyConfig {
    ProxyConfig {
        upstream_base_url: UpstreamBaseUrl::try_new(base_url.to_string()).unwrap(),
        caller_key_header: HeaderName::from_static(X_API_KEY),
        max_request_size: RequestSizeLimit::try_new(1024 * 1024).unwrap(),
        request_timeout: Duration::from_secs(5),
        log_content: true,
    }
}

/// Serve `router` on an ephemeral local port
pub async fn spawn_upstream(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Publisher that keeps every record in memory
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    records: Arc<Mutex<Vec<BrokerRecord>>>,
}

impl RecordingPublisher {
    pub fn records(&self) -> Vec<BrokerRecord> {
        self.records.lock().unwrap().clone()
    }

    fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn topics(&self) -> Vec<Topic> {
        self.records().iter().map(|r| r.topic).collect()
    }

    /// Wait until at least `count` records arrived, or give up after 2s
    pub async fn wait_for(&self, count: usize) -> Vec<BrokerRecord> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while self.len() < count && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.records()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, key: &str, payload: Bytes, topic: Topic) {
        self.records.lock().unwrap().push(BrokerRecord {
            key: key.to_string(),
            payload,
            topic,
        });
    }
}
