use anyhow::Result;
use tracing::info;
use usage_relay::config::Settings;
use usage_relay::infrastructure::log_messages::application as messages;
use usage_relay::infrastructure::telemetry::init_tracing;
use usage_relay::Application;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::new()?;
    init_tracing(&settings.logging)?;

    info!(
        environment = %settings.application.environment,
        "{}",
        messages::STARTING
    );

    let app = Application::from_settings(settings).await?;
    app.run().await?;

    Ok(())
}
