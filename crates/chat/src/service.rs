use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use movequote_core::audit::{AuditContext, AuditSink, NoopAuditSink};
use movequote_core::config::{AdminConfig, AppConfig};
use movequote_core::errors::ApplicationError;
use movequote_core::flows::{DialogController, DialogEffect, DialogReply, InputError, UserAction};
use movequote_core::pricing::DeterministicQuoteEngine;
use movequote_core::rates::RateTable;
use movequote_rates::RateStore;
use tracing::{error, info, warn};

use crate::blocks::{
    error_message, help_message, notice_message, price_list_message, prompt_message, quote_message,
    rates_refreshed_message, MessageTemplate,
};
use crate::events::{ChatKey, EventContext, EventHandlerError};
use crate::sessions::SessionRegistry;

const NO_SESSION_HINT: &str = "Send /start to get a quote.";

/// What the chat handlers need from the conversation layer.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn act(
        &self,
        key: ChatKey,
        action: UserAction,
        ctx: &EventContext,
    ) -> Result<Vec<MessageTemplate>, EventHandlerError>;

    async fn show_prices(
        &self,
        key: ChatKey,
        ctx: &EventContext,
    ) -> Result<Vec<MessageTemplate>, EventHandlerError>;

    async fn update_prices(
        &self,
        key: ChatKey,
        ctx: &EventContext,
    ) -> Result<Vec<MessageTemplate>, EventHandlerError>;

    fn is_admin(&self, _key: ChatKey) -> bool {
        false
    }

    fn help(&self, key: ChatKey) -> MessageTemplate {
        help_message(self.is_admin(key))
    }
}

#[async_trait]
impl<T> ChatService for Arc<T>
where
    T: ChatService + ?Sized,
{
    async fn act(
        &self,
        key: ChatKey,
        action: UserAction,
        ctx: &EventContext,
    ) -> Result<Vec<MessageTemplate>, EventHandlerError> {
        (**self).act(key, action, ctx).await
    }

    async fn show_prices(
        &self,
        key: ChatKey,
        ctx: &EventContext,
    ) -> Result<Vec<MessageTemplate>, EventHandlerError> {
        (**self).show_prices(key, ctx).await
    }

    async fn update_prices(
        &self,
        key: ChatKey,
        ctx: &EventContext,
    ) -> Result<Vec<MessageTemplate>, EventHandlerError> {
        (**self).update_prices(key, ctx).await
    }

    fn is_admin(&self, key: ChatKey) -> bool {
        (**self).is_admin(key)
    }

    fn help(&self, key: ChatKey) -> MessageTemplate {
        (**self).help(key)
    }
}

/// Drives one dialog step per update against the shared rate snapshot.
pub struct ConversationService {
    controller: DialogController<DeterministicQuoteEngine>,
    rates: Arc<RateStore>,
    sessions: Arc<SessionRegistry>,
    admin: AdminConfig,
    audit: Arc<dyn AuditSink>,
}

impl ConversationService {
    pub fn new(
        controller: DialogController<DeterministicQuoteEngine>,
        rates: Arc<RateStore>,
        sessions: Arc<SessionRegistry>,
        admin: AdminConfig,
    ) -> Self {
        Self { controller, rates, sessions, admin, audit: Arc::new(NoopAuditSink) }
    }

    pub fn from_config(config: &AppConfig, rates: Arc<RateStore>, sessions: Arc<SessionRegistry>) -> Self {
        let timeout = Duration::seconds(i64::try_from(config.session.timeout_secs).unwrap_or(i64::MAX));
        let controller =
            DialogController::new(DeterministicQuoteEngine::new(config.chat.currency_label.clone()))
                .with_timeout(timeout);
        Self::new(controller, rates, sessions, config.admin.clone())
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn rates(&self) -> &Arc<RateStore> {
        &self.rates
    }

    fn currency(&self) -> &str {
        self.controller.engine().currency()
    }

    /// Drops idle sessions. Called periodically by the host process.
    pub fn sweep_expired(&self) -> usize {
        let dropped = self.sessions.sweep_expired(Utc::now(), self.controller.session_timeout());
        if dropped > 0 {
            info!(
                event_name = "dialog.sessions_swept",
                dropped,
                remaining = self.sessions.len(),
                "idle sessions dropped"
            );
        }
        dropped
    }

    async fn refresh_messages(&self, ctx: &EventContext) -> Vec<MessageTemplate> {
        match self.rates.refresh().await {
            Ok(report) => vec![rates_refreshed_message(&report, self.currency())],
            Err(refresh_error) => {
                warn!(
                    event_name = "rates.refresh_failed",
                    correlation_id = %ctx.correlation_id,
                    error = %refresh_error,
                    "manual price refresh failed, keeping the previous table"
                );
                vec![error_message(
                    &format!("Prices were not updated: {refresh_error}"),
                    &ctx.correlation_id,
                )]
            }
        }
    }

    async fn render_reply(
        &self,
        key: ChatKey,
        reply: DialogReply,
        table: &RateTable,
        ctx: &EventContext,
    ) -> Vec<MessageTemplate> {
        let mut messages = Vec::new();

        if let Some(pricing) = &reply.pricing {
            if !reply.notices.is_empty() {
                messages.push(prompt_message(&reply.notices, None));
            }
            messages.push(quote_message(&pricing.quote));
        }

        for effect in &reply.effects {
            match effect {
                DialogEffect::ShowPriceList => {
                    messages.push(price_list_message(Some(table), self.currency()));
                }
                DialogEffect::RefreshRates => messages.extend(self.refresh_messages(ctx).await),
                DialogEffect::EndSession => {
                    self.sessions.remove(key);
                }
            }
        }

        let notices: &[String] = if reply.pricing.is_some() { &[] } else { &reply.notices };
        if !notices.is_empty() || reply.prompt.is_some() {
            messages.push(prompt_message(notices, reply.prompt.as_ref()));
        }
        messages
    }
}

#[async_trait]
impl ChatService for ConversationService {
    async fn act(
        &self,
        key: ChatKey,
        action: UserAction,
        ctx: &EventContext,
    ) -> Result<Vec<MessageTemplate>, EventHandlerError> {
        let lifecycle = matches!(action, UserAction::Start | UserAction::Cancel);
        if !lifecycle && !self.sessions.contains(key) {
            return Ok(vec![notice_message(NO_SESSION_HINT)]);
        }

        let snapshot = match self.rates.get_or_load().await {
            Ok(snapshot) => Some(snapshot),
            Err(load_error) => {
                warn!(
                    event_name = "rates.unavailable",
                    correlation_id = %ctx.correlation_id,
                    session = %key,
                    error = %load_error,
                    "no rate table available for this update"
                );
                if !lifecycle {
                    let failure = ApplicationError::RatesUnavailable(load_error.to_string())
                        .into_interface(ctx.correlation_id.clone());
                    return Ok(vec![error_message(failure.user_message(), failure.correlation_id())]);
                }
                None
            }
        };
        let empty = RateTable::default();
        let table = snapshot.as_ref().map_or(&empty, |snapshot| &snapshot.table);

        let audit = AuditContext::new(Some(key.to_string()), ctx.correlation_id.clone(), "chat");
        let is_admin = self.is_admin(key);
        let outcome = self.sessions.with_session(key, is_admin, Utc::now(), |session| {
            self.controller.handle_with_audit(session, action, table, Utc::now(), &*self.audit, &audit)
        });

        match outcome {
            Ok(reply) => Ok(self.render_reply(key, reply, table, ctx).await),
            Err(dialog_error) => {
                error!(
                    event_name = "dialog.session_aborted",
                    correlation_id = %ctx.correlation_id,
                    session = %key,
                    error = %dialog_error,
                    "dialog step failed, discarding the session"
                );
                self.sessions.remove(key);
                let failure =
                    ApplicationError::Dialog(dialog_error).into_interface(ctx.correlation_id.clone());
                Ok(vec![error_message(failure.user_message(), failure.correlation_id())])
            }
        }
    }

    async fn show_prices(
        &self,
        key: ChatKey,
        _ctx: &EventContext,
    ) -> Result<Vec<MessageTemplate>, EventHandlerError> {
        if !self.is_admin(key) {
            return Ok(vec![notice_message(&InputError::AdminOnly.to_string())]);
        }
        let snapshot = self.rates.get_or_load().await.ok();
        Ok(vec![price_list_message(snapshot.as_ref().map(|snapshot| &snapshot.table), self.currency())])
    }

    async fn update_prices(
        &self,
        key: ChatKey,
        ctx: &EventContext,
    ) -> Result<Vec<MessageTemplate>, EventHandlerError> {
        if !self.is_admin(key) {
            return Ok(vec![notice_message(&InputError::AdminOnly.to_string())]);
        }
        Ok(self.refresh_messages(ctx).await)
    }

    fn is_admin(&self, key: ChatKey) -> bool {
        self.admin.is_admin(key.user_id)
    }
}
