use anyhow::Context;

use mailing_list::config::get_configuration;
use mailing_list::startup::Application;
use mailing_list::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber(
        String::from("mailing_list"),
        String::from("info"),
        std::io::stdout,
    );

    init_subscriber(subscriber)?;

    let config = get_configuration().context("Failed to load configuration.")?;
    let application = Application::build(config)
        .await
        .context("Failed to start the mailing list service.")?;
    let shutdown = application.shutdown_token();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown requested, stopping API servers");
                shutdown.cancel();
            }
            Err(err) => tracing::error!("Failed to listen for the shutdown signal: {:?}", err),
        }
    });

    application.run_until_stopped().await?;

    Ok(())
}
