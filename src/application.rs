use crate::config::{PublisherKind, PublisherSettings, Settings};
use crate::infrastructure::log_messages::application as messages;
use crate::infrastructure::publisher::{PublisherHandle, QueueCapacity, QueuedPublisher};
use crate::infrastructure::{LogSink, RestProxySink};
use crate::proxy::ProxyService;
use crate::{Error, Result};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, instrument};

/// How long queued audit events may take to drain on shutdown
const DRAIN_GRACE: Duration = Duration::from_secs(10);

/// Main application struct that coordinates all components
pub struct Application {
    settings: Settings,
    listener: TcpListener,
    router: Router,
    publisher_handle: PublisherHandle,
}

impl Application {
    #[instrument]
    pub async fn new() -> Result<Self> {
        Self::from_settings(Settings::new()?).await
    }

    /// Build every component and bind the listener. Must run inside a tokio
    /// runtime because the publisher spawns its dispatcher here.
    pub async fn from_settings(settings: Settings) -> Result<Self> {
        let proxy_config = settings.proxy_config()?;
        let (publisher, publisher_handle) = build_publisher(&settings.publisher)?;
        let router = ProxyService::new(proxy_config, Arc::new(publisher))?.into_router();

        let listener = TcpListener::bind((
            settings.application.host.as_str(),
            settings.application.port,
        ))
        .await?;

        Ok(Self {
            settings,
            listener,
            router,
            publisher_handle,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Serve until Ctrl-C or SIGTERM
    pub async fn run(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Serve until `signal` resolves, then drain the audit queue
    #[instrument(skip_all)]
    pub async fn run_until<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(
            address = %self.listener.local_addr()?,
            upstream = %self.settings.upstream.base_url,
            publisher = ?self.settings.publisher.kind,
            "{}",
            messages::LISTENING
        );

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(signal)
            .await?;

        // The router and its publisher clones are gone, so the queue closes
        // once in-flight audit tasks finish
        self.publisher_handle.shutdown(DRAIN_GRACE).await;
        info!("{}", messages::STOPPED);

        Ok(())
    }
}

/// Start the dispatcher for the configured sink
pub fn build_publisher(
    settings: &PublisherSettings,
) -> Result<(QueuedPublisher, PublisherHandle)> {
    let capacity = QueueCapacity::try_new(settings.queue_capacity)
        .map_err(|e| Error::invalid_setting("publisher.queue_capacity", e.to_string()))?;

    match settings.kind {
        PublisherKind::Log => Ok(QueuedPublisher::spawn(LogSink, capacity)),
        PublisherKind::RestProxy => {
            let url = settings.rest_proxy_url.clone().ok_or_else(|| {
                Error::invalid_setting("publisher.rest_proxy_url", "required for rest_proxy")
            })?;
            let sink = RestProxySink::new(
                url,
                settings.api_key.clone(),
                settings.api_secret.clone(),
                Duration::from_secs(settings.delivery_timeout_secs),
            )?;
            Ok(QueuedPublisher::spawn(sink, capacity))
        }
        PublisherKind::Kafka => build_kafka_publisher(settings, capacity),
    }
}

#[cfg(feature = "kafka")]
fn build_kafka_publisher(
    settings: &PublisherSettings,
    capacity: QueueCapacity,
) -> Result<(QueuedPublisher, PublisherHandle)> {
    let servers = settings.bootstrap_servers.as_deref().ok_or_else(|| {
        Error::invalid_setting("publisher.bootstrap_servers", "required for kafka")
    })?;
    let sink = crate::infrastructure::KafkaSink::new(
        servers,
        settings.api_key.clone(),
        settings.api_secret.clone(),
        Duration::from_secs(settings.delivery_timeout_secs),
    )?;
    Ok(QueuedPublisher::spawn(sink, capacity))
}

#[cfg(not(feature = "kafka"))]
fn build_kafka_publisher(
    _settings: &PublisherSettings,
    _capacity: QueueCapacity,
) -> Result<(QueuedPublisher, PublisherHandle)> {
    Err(Error::invalid_setting(
        "publisher.kind",
        "kafka support is not compiled in, rebuild with `--features kafka`",
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("{}", messages::SHUTDOWN_SIGNAL);
}
