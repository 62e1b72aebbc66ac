use std::sync::Arc;
use std::time::Duration;

use movequote_chat::ConversationService;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Drops idle sessions every `interval` until the task is aborted.
pub fn spawn(service: Arc<ConversationService>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick fires immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let dropped = service.sweep_expired();
            debug!(event_name = "system.sweeper.tick", dropped, "session sweep finished");
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use movequote_chat::{ChatKey, ConversationService, SessionRegistry};
    use movequote_core::config::AdminConfig;
    use movequote_core::flows::DialogController;
    use movequote_core::pricing::DeterministicQuoteEngine;
    use movequote_rates::{RateSourceChain, RateStore};

    use super::spawn;

    #[tokio::test]
    async fn idle_sessions_are_swept_in_the_background() {
        let sessions = Arc::new(SessionRegistry::new());
        let controller = DialogController::new(DeterministicQuoteEngine::new("RUB"))
            .with_timeout(chrono::Duration::zero());
        let service = Arc::new(ConversationService::new(
            controller,
            Arc::new(RateStore::new(RateSourceChain::new(Vec::new()))),
            Arc::clone(&sessions),
            AdminConfig::default(),
        ));
        sessions.with_session(ChatKey::new(1, 1), false, Utc::now(), |_| ());

        let handle = spawn(service, Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert!(sessions.is_empty());
    }
}
