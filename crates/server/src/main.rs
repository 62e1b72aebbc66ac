mod bootstrap;
mod health;
mod sweeper;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use movequote_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use movequote_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        health::HealthState::new(Arc::clone(&app.rates), Arc::clone(&app.sessions)),
    )
    .await?;

    let sweeper = sweeper::spawn(
        Arc::clone(&app.service),
        Duration::from_secs(app.config.session.sweep_interval_secs),
    );

    tracing::info!(
        event_name = "system.server.chat_transport_mode",
        transport_mode = app.transport_mode,
        correlation_id = "bootstrap",
        "chat runner transport mode initialized"
    );

    let runner = app.chat_runner;
    let mut chat = tokio::spawn(async move { runner.start().await });

    tracing::info!(event_name = "system.server.started", correlation_id = "bootstrap", "movequote-server started");

    tokio::select! {
        signal = tokio::signal::ctrl_c() => signal?,
        // a closed transport is not a reason to stop serving health checks
        _ = &mut chat => tokio::signal::ctrl_c().await?,
    }

    tracing::info!(event_name = "system.server.stopping", correlation_id = "shutdown", "movequote-server stopping");
    sweeper.abort();

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    if !chat.is_finished() && tokio::time::timeout(grace, &mut chat).await.is_err() {
        tracing::warn!(
            event_name = "system.server.shutdown_timeout",
            correlation_id = "shutdown",
            grace_secs = grace.as_secs(),
            "chat runner did not stop in time; aborting"
        );
        chat.abort();
    }

    tracing::info!(
        event_name = "system.server.stopped",
        correlation_id = "shutdown",
        active_sessions = app.sessions.len(),
        "movequote-server stopped"
    );
    Ok(())
}
