//! Shared fixtures for the integration tests

#![allow(dead_code)]

use axum::body::Bytes;
use axum::http::header;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use usage_relay::config::Settings;
use usage_relay::Application;

pub const COMPLETION: &str = r#"{"id":"cmpl-1","object":"chat.completion","model":"gpt-x","choices":[{"index":0,"message":{"role":"assistant","content":"Hi"},"finish_reason":"stop"}],"usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15},"created":1700000000}"#;

/// base64 of the caller key used throughout, as it appears in produce requests
pub const CALLER_KEY_B64: &str = "YWJjMTIz";

/// Serve a completions API look-alike under `/v1` on an ephemeral port
pub async fn spawn_completions_api() -> SocketAddr {
    let router = Router::new()
        .route(
            "/v1/chat/completions",
            post(|| async { ([(header::CONTENT_TYPE, "application/json")], COMPLETION) }),
        )
        .route(
            "/v1/models",
            get(|| async { ([(header::CONTENT_TYPE, "application/json")], r#"{"data":[]}"#) }),
        )
        .route("/v1/echo", post(|body: Bytes| async move { body }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Settings for a relay on an ephemeral local port
pub fn relay_settings(upstream: SocketAddr, overrides: &[(&str, String)]) -> Settings {
    let mut builder = Settings::builder("test")
        .unwrap()
        .set_override("application.host", "127.0.0.1")
        .unwrap()
        .set_override("application.port", 0)
        .unwrap()
        .set_override("upstream.base_url", format!("http://{upstream}/v1"))
        .unwrap();

    for (key, value) in overrides {
        builder = builder.set_override(*key, value.as_str()).unwrap();
    }

    builder.build().unwrap().try_deserialize().unwrap()
}

/// A relay serving in the background until `stop` fires
pub struct RunningRelay {
    pub addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<usage_relay::Result<()>>,
}

impl RunningRelay {
    pub async fn start(settings: Settings) -> Self {
        let app = Application::from_settings(settings).await.unwrap();
        let addr = app.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(app.run_until(async move {
            let _ = stopped.await;
        }));

        Self { addr, stop, task }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Stop accepting calls and wait for the audit queue to drain
    pub async fn stop(self) {
        let _ = self.stop.send(());
        self.task.await.unwrap().unwrap();
    }
}
