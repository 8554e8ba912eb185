//! Tracing subscriber setup

use crate::config::LoggingSettings;
use anyhow::Context;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
pub fn init_tracing(settings: &LoggingSettings) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match settings.format.as_str() {
        "json" => registry
            .with(fmt::layer().json().with_target(false).with_level(true))
            .try_init(),
        _ => registry
            .with(fmt::layer().with_target(false).with_level(true).with_ansi(true))
            .try_init(),
    }
    .context("tracing subscriber already installed")
}
