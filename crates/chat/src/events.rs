use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use movequote_core::flows::{Choice, InputError, UserAction};
use thiserror::Error;
use tracing::warn;

use crate::blocks::{help_message, notice_message, MessageTemplate};
use crate::commands::{
    parse_command, CommandParseError, CommandPayload, CommandRouteError, CommandRouter,
};
use crate::service::ChatService;

/// One dialog session per user per chat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChatKey {
    pub chat_id: i64,
    pub user_id: i64,
}

impl ChatKey {
    pub fn new(chat_id: i64, user_id: i64) -> Self {
        Self { chat_id, user_id }
    }
}

impl fmt::Display for ChatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chat_id, self.user_id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatEnvelope {
    pub envelope_id: String,
    pub key: ChatKey,
    pub event: ChatEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatEvent {
    Command(CommandPayload),
    Message(MessageEvent),
    ButtonPress(ButtonPressEvent),
    Unsupported { event_type: String },
}

impl ChatEvent {
    /// Typed text: commands start with `/`, everything else is a message.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim_start().starts_with('/') {
            Self::Command(CommandPayload { text })
        } else {
            Self::Message(MessageEvent { text })
        }
    }

    pub fn button(action_id: impl Into<String>) -> Self {
        Self::ButtonPress(ButtonPressEvent { action_id: action_id.into() })
    }

    pub fn event_type(&self) -> ChatEventType {
        match self {
            Self::Command(_) => ChatEventType::Command,
            Self::Message(_) => ChatEventType::Message,
            Self::ButtonPress(_) => ChatEventType::ButtonPress,
            Self::Unsupported { .. } => ChatEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChatEventType {
    Command,
    Message,
    ButtonPress,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ButtonPressEvent {
    pub action_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(Vec<MessageTemplate>),
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Parse(#[from] CommandParseError),
    #[error(transparent)]
    Route(#[from] CommandRouteError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> ChatEventType;
    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<ChatEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Dispatcher with command, message and button handlers sharing one service.
pub fn conversation_dispatcher<S>(service: Arc<S>) -> EventDispatcher
where
    S: ChatService + 'static,
{
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(CommandHandler::new(Arc::clone(&service)));
    dispatcher.register(MessageHandler::new(Arc::clone(&service)));
    dispatcher.register(ButtonPressHandler::new(service));
    dispatcher
}

fn responded(messages: Vec<MessageTemplate>) -> HandlerResult {
    if messages.is_empty() {
        HandlerResult::Processed
    } else {
        HandlerResult::Responded(messages)
    }
}

pub struct CommandHandler<S> {
    router: CommandRouter<S>,
}

impl<S> CommandHandler<S>
where
    S: ChatService,
{
    pub fn new(service: S) -> Self {
        Self { router: CommandRouter::new(service) }
    }
}

#[async_trait]
impl<S> EventHandler for CommandHandler<S>
where
    S: ChatService + 'static,
{
    fn event_type(&self) -> ChatEventType {
        ChatEventType::Command
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::Command(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let command = match parse_command(&payload.text) {
            Ok(command) => command,
            Err(CommandParseError::UnsupportedCommand(name)) => {
                warn!(
                    event_name = "ingress.chat.unknown_command",
                    correlation_id = %ctx.correlation_id,
                    command = %name,
                    "unknown command, replying with help"
                );
                let is_admin = self.router.service().is_admin(envelope.key);
                return Ok(HandlerResult::Responded(vec![help_message(is_admin)]));
            }
            Err(error) => return Err(error.into()),
        };

        let messages = self.router.route(envelope.key, command, ctx).await?;
        Ok(responded(messages))
    }
}

pub struct MessageHandler<S> {
    service: S,
}

impl<S> MessageHandler<S>
where
    S: ChatService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for MessageHandler<S>
where
    S: ChatService + 'static,
{
    fn event_type(&self) -> ChatEventType {
        ChatEventType::Message
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::Message(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let messages =
            self.service.act(envelope.key, UserAction::Text(event.text.clone()), ctx).await?;
        Ok(responded(messages))
    }
}

pub struct ButtonPressHandler<S> {
    service: S,
}

impl<S> ButtonPressHandler<S>
where
    S: ChatService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for ButtonPressHandler<S>
where
    S: ChatService + 'static,
{
    fn event_type(&self) -> ChatEventType {
        ChatEventType::ButtonPress
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::ButtonPress(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let Some(choice) = Choice::from_action_id(&event.action_id) else {
            warn!(
                event_name = "ingress.chat.unknown_action",
                correlation_id = %ctx.correlation_id,
                action_id = %event.action_id,
                "button press with an unknown action id"
            );
            return Ok(HandlerResult::Responded(vec![notice_message(
                &InputError::UnexpectedChoice.to_string(),
            )]));
        };

        let messages = self.service.act(envelope.key, UserAction::Choose(choice), ctx).await?;
        Ok(responded(messages))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use movequote_core::flows::UserAction;

    use super::{
        conversation_dispatcher, ChatEnvelope, ChatEvent, ChatEventType, ChatKey, EventContext,
        EventDispatcher, EventHandlerError, HandlerResult,
    };
    use crate::blocks::{notice_message, MessageTemplate};
    use crate::service::ChatService;

    #[derive(Default)]
    struct EchoService {
        actions: Mutex<Vec<UserAction>>,
    }

    #[async_trait]
    impl ChatService for EchoService {
        async fn act(
            &self,
            _key: ChatKey,
            action: UserAction,
            _ctx: &EventContext,
        ) -> Result<Vec<MessageTemplate>, EventHandlerError> {
            let described = action.describe();
            self.actions.lock().expect("actions lock").push(action);
            Ok(vec![notice_message(&described)])
        }

        async fn show_prices(
            &self,
            _key: ChatKey,
            _ctx: &EventContext,
        ) -> Result<Vec<MessageTemplate>, EventHandlerError> {
            Ok(Vec::new())
        }

        async fn update_prices(
            &self,
            _key: ChatKey,
            _ctx: &EventContext,
        ) -> Result<Vec<MessageTemplate>, EventHandlerError> {
            Ok(Vec::new())
        }

        fn help(&self, _key: ChatKey) -> MessageTemplate {
            notice_message("help")
        }
    }

    fn envelope(event: ChatEvent) -> ChatEnvelope {
        ChatEnvelope { envelope_id: "env-1".to_owned(), key: ChatKey::new(10, 20), event }
    }

    #[test]
    fn typed_text_is_split_into_commands_and_messages() {
        assert_eq!(ChatEvent::from_text("/start").event_type(), ChatEventType::Command);
        assert_eq!(ChatEvent::from_text("12").event_type(), ChatEventType::Message);
        assert_eq!(ChatEvent::button("yes").event_type(), ChatEventType::ButtonPress);
        assert_eq!(ChatKey::new(10, 20).to_string(), "10:20");
    }

    #[tokio::test]
    async fn empty_dispatcher_ignores_events() {
        let dispatcher = EventDispatcher::default();
        let result = dispatcher
            .dispatch(&envelope(ChatEvent::from_text("hi")), &EventContext::default())
            .await
            .expect("dispatch");
        assert_eq!(result, HandlerResult::Ignored);
    }

    #[tokio::test]
    async fn conversation_dispatcher_routes_every_event_kind() {
        let service = Arc::new(EchoService::default());
        let dispatcher = conversation_dispatcher(Arc::clone(&service));
        let ctx = EventContext::default();
        assert_eq!(dispatcher.handler_count(), 3);

        for event in [
            ChatEvent::from_text("/start"),
            ChatEvent::from_text("42"),
            ChatEvent::button("zone:near"),
        ] {
            let result = dispatcher.dispatch(&envelope(event), &ctx).await.expect("dispatch");
            assert!(matches!(result, HandlerResult::Responded(_)));
        }

        let actions = service.actions.lock().expect("actions lock").clone();
        assert_eq!(actions.len(), 3);
        assert_eq!(actions[0], UserAction::Start);
        assert_eq!(actions[1], UserAction::Text("42".to_owned()));
        assert_eq!(actions[2].describe(), "zone:near");
    }

    #[tokio::test]
    async fn unknown_command_replies_with_help() {
        let service = Arc::new(EchoService::default());
        let dispatcher = conversation_dispatcher(Arc::clone(&service));

        let result = dispatcher
            .dispatch(&envelope(ChatEvent::from_text("/quote")), &EventContext::default())
            .await
            .expect("dispatch");

        match result {
            HandlerResult::Responded(messages) => {
                assert!(messages[0].render_text().contains("/start"));
            }
            other => panic!("expected help reply, got {other:?}"),
        }
        assert!(service.actions.lock().expect("actions lock").is_empty());
    }

    #[tokio::test]
    async fn unknown_button_is_rejected_without_reaching_the_service() {
        let service = Arc::new(EchoService::default());
        let dispatcher = conversation_dispatcher(Arc::clone(&service));

        let result = dispatcher
            .dispatch(&envelope(ChatEvent::button("kind:spaceship")), &EventContext::default())
            .await
            .expect("dispatch");

        match result {
            HandlerResult::Responded(messages) => {
                assert!(messages[0].render_text().contains("not available"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert!(service.actions.lock().expect("actions lock").is_empty());
    }
}
