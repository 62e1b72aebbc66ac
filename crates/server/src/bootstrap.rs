use std::sync::Arc;

use movequote_chat::{
    conversation_dispatcher, ChatRunner, ConversationService, NoopChatTransport, SessionRegistry,
};
use movequote_core::config::{AppConfig, ConfigError, LoadOptions};
use movequote_rates::{RateSourceChain, RateSourceError, RateStore};
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub rates: Arc<RateStore>,
    pub sessions: Arc<SessionRegistry>,
    pub service: Arc<ConversationService>,
    pub chat_runner: ChatRunner,
    pub transport_mode: &'static str,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("rate sources could not be configured: {0}")]
    RateSources(#[source] RateSourceError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Wires the conversation service. A failed rate warm-up is not fatal: the store loads
/// lazily on the first quote and `/health` reports degraded until then.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", correlation_id = "bootstrap", "starting application bootstrap");

    let chain = RateSourceChain::from_config(&config.rates).map_err(BootstrapError::RateSources)?;
    let rates = Arc::new(RateStore::new(chain));

    match rates.refresh().await {
        Ok(report) => info!(
            event_name = "system.bootstrap.rates_loaded",
            correlation_id = "bootstrap",
            source = %report.source,
            "rate table loaded"
        ),
        Err(error) => warn!(
            event_name = "system.bootstrap.rates_deferred",
            correlation_id = "bootstrap",
            error = %error,
            "rate table unavailable at startup; will retry on first use"
        ),
    }

    let sessions = Arc::new(SessionRegistry::new());
    let service =
        Arc::new(ConversationService::from_config(&config, Arc::clone(&rates), Arc::clone(&sessions)));

    // No platform transport is bundled; the runner idles until one is plugged in.
    let chat_runner =
        ChatRunner::new(Arc::new(NoopChatTransport), conversation_dispatcher(Arc::clone(&service)));

    Ok(Application { config, rates, sessions, service, chat_runner, transport_mode: "noop" })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use movequote_core::config::{ConfigOverrides, LoadOptions};
    use tempfile::TempDir;

    use crate::bootstrap::bootstrap;

    fn options(overrides: ConfigOverrides) -> LoadOptions {
        LoadOptions { overrides, ..LoadOptions::default() }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_on_invalid_config() {
        let result = bootstrap(options(ConfigOverrides {
            log_level: Some("loud".to_string()),
            ..ConfigOverrides::default()
        }))
        .await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("logging.level"));
    }

    #[tokio::test]
    async fn bootstrap_warms_the_rate_store_from_the_fallback_file() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("prices.json");
        fs::write(&path, r#"{"boundary_km": 60, "storage": {"per_day_per_m3": 10}}"#).expect("fixture");

        let app = bootstrap(options(ConfigOverrides {
            rates_fallback_path: Some(path),
            ..ConfigOverrides::default()
        }))
        .await
        .expect("bootstrap should succeed");

        let snapshot = app.rates.current().await.expect("rates loaded at startup");
        assert_eq!(snapshot.source, "file");
        assert_eq!(snapshot.table.amount("boundary_km"), 60);
        assert!(app.sessions.is_empty());
        assert_eq!(app.transport_mode, "noop");
    }

    #[tokio::test]
    async fn bootstrap_survives_unavailable_rates() {
        let dir = TempDir::new().expect("temp dir");

        let app = bootstrap(options(ConfigOverrides {
            rates_fallback_path: Some(dir.path().join("missing.json")),
            ..ConfigOverrides::default()
        }))
        .await
        .expect("missing rates should not stop startup");

        assert!(app.rates.current().await.is_none());
        app.chat_runner.start().await.expect("noop runner drains immediately");
    }
}
