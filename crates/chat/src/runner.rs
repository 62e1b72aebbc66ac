use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::blocks::{error_message, MessageTemplate};
use crate::events::{ChatEnvelope, ChatKey, EventContext, EventDispatcher, HandlerResult};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport send failed: {0}")]
    Send(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

/// Connection to a chat platform: a stream of updates in, rendered messages out.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError>;
    async fn send(&self, key: ChatKey, message: &MessageTemplate) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopChatTransport;

#[async_trait]
impl ChatTransport for NoopChatTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError> {
        Ok(None)
    }

    async fn acknowledge(&self, _envelope_id: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send(&self, _key: ChatKey, _message: &MessageTemplate) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

pub struct ChatRunner {
    transport: Arc<dyn ChatTransport>,
    dispatcher: EventDispatcher,
}

impl Default for ChatRunner {
    fn default() -> Self {
        Self { transport: Arc::new(NoopChatTransport), dispatcher: EventDispatcher::default() }
    }
}

impl ChatRunner {
    pub fn new(transport: Arc<dyn ChatTransport>, dispatcher: EventDispatcher) -> Self {
        Self { transport, dispatcher }
    }

    /// Opens one connection and handles updates in arrival order until the stream ends.
    /// Connect and read failures end the run; the caller decides whether to start again.
    pub async fn start(&self) -> Result<(), TransportError> {
        self.transport.connect().await?;
        info!(event_name = "ingress.chat.connected", "chat transport connected");

        while let Some(envelope) = self.transport.next_envelope().await? {
            self.handle(&envelope).await;
        }

        info!(event_name = "ingress.chat.closed", "chat update stream ended");
        self.transport.disconnect().await
    }

    async fn handle(&self, envelope: &ChatEnvelope) {
        info!(
            event_name = "ingress.chat.envelope_received",
            envelope_id = %envelope.envelope_id,
            event_type = ?envelope.event.event_type(),
            correlation_id = %envelope.envelope_id,
            session = %envelope.key,
            "chat update received"
        );

        match self.transport.acknowledge(&envelope.envelope_id).await {
            Ok(()) => debug!(
                event_name = "ingress.chat.ack_sent",
                envelope_id = %envelope.envelope_id,
                "chat update acknowledged"
            ),
            Err(error) => warn!(
                event_name = "ingress.chat.ack_failed",
                envelope_id = %envelope.envelope_id,
                error = %error,
                "chat update could not be acknowledged"
            ),
        }

        let context = EventContext { correlation_id: envelope.envelope_id.clone() };
        let messages = match self.dispatcher.dispatch(envelope, &context).await {
            Ok(HandlerResult::Responded(messages)) => messages,
            Ok(HandlerResult::Processed | HandlerResult::Ignored) => Vec::new(),
            Err(error) => {
                warn!(
                    event_name = "ingress.chat.dispatch_failed",
                    correlation_id = %envelope.envelope_id,
                    session = %envelope.key,
                    error = %error,
                    "chat update handler failed"
                );
                vec![error_message("That did not work. Please try again.", &context.correlation_id)]
            }
        };

        for message in &messages {
            if let Err(error) = self.transport.send(envelope.key, message).await {
                warn!(
                    event_name = "egress.chat.send_failed",
                    envelope_id = %envelope.envelope_id,
                    session = %envelope.key,
                    error = %error,
                    "reply was not delivered"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use super::{ChatRunner, ChatTransport, TransportError};
    use crate::blocks::{notice_message, MessageTemplate};
    use crate::commands::CommandRouteError;
    use crate::events::{
        ChatEnvelope, ChatEvent, ChatEventType, ChatKey, EventContext, EventDispatcher,
        EventHandler, EventHandlerError, HandlerResult,
    };
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct ScriptedTransport {
        state: Mutex<ScriptedState>,
    }

    #[derive(Default)]
    struct ScriptedState {
        connect_result: Option<TransportError>,
        envelopes: VecDeque<Result<Option<ChatEnvelope>, TransportError>>,
        connected: bool,
        disconnected: bool,
        acknowledgements: Vec<String>,
        sent: Vec<(ChatKey, String)>,
    }

    impl ScriptedTransport {
        fn with_envelopes(envelopes: Vec<Result<Option<ChatEnvelope>, TransportError>>) -> Self {
            Self {
                state: Mutex::new(ScriptedState { envelopes: envelopes.into(), ..ScriptedState::default() }),
            }
        }

        fn refusing(error: TransportError) -> Self {
            Self {
                state: Mutex::new(ScriptedState { connect_result: Some(error), ..ScriptedState::default() }),
            }
        }

        async fn acknowledgements(&self) -> Vec<String> {
            self.state.lock().await.acknowledgements.clone()
        }

        async fn sent(&self) -> Vec<(ChatKey, String)> {
            self.state.lock().await.sent.clone()
        }

        async fn disconnected(&self) -> bool {
            self.state.lock().await.disconnected
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn connect(&self) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            match state.connect_result.take() {
                Some(error) => Err(error),
                None => {
                    state.connected = true;
                    Ok(())
                }
            }
        }

        async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError> {
            let mut state = self.state.lock().await;
            assert!(state.connected, "read before connect");
            state.envelopes.pop_front().unwrap_or(Ok(None))
        }

        async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.acknowledgements.push(envelope_id.to_owned());
            Ok(())
        }

        async fn send(&self, key: ChatKey, message: &MessageTemplate) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.sent.push((key, message.fallback_text.clone()));
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            self.state.lock().await.disconnected = true;
            Ok(())
        }
    }

    struct EchoHandler;

    #[async_trait]
    impl EventHandler for EchoHandler {
        fn event_type(&self) -> ChatEventType {
            ChatEventType::Message
        }

        async fn handle(
            &self,
            envelope: &ChatEnvelope,
            _ctx: &EventContext,
        ) -> Result<HandlerResult, EventHandlerError> {
            let ChatEvent::Message(event) = &envelope.event else {
                return Ok(HandlerResult::Ignored);
            };
            if event.text == "fail" {
                return Err(CommandRouteError::Service("rates offline".to_owned()).into());
            }
            Ok(HandlerResult::Responded(vec![notice_message(&format!("echo {}", event.text))]))
        }
    }

    fn envelope(id: &str, event: ChatEvent) -> Result<Option<ChatEnvelope>, TransportError> {
        Ok(Some(ChatEnvelope { envelope_id: id.to_owned(), key: ChatKey::new(3, 4), event }))
    }

    fn echo_dispatcher() -> EventDispatcher {
        let mut dispatcher = EventDispatcher::new();
        dispatcher.register(EchoHandler);
        dispatcher
    }

    #[tokio::test]
    async fn replies_are_sent_back_to_the_originating_chat() {
        let transport = Arc::new(ScriptedTransport::with_envelopes(vec![
            envelope("env-1", ChatEvent::from_text("hi")),
            envelope("env-2", ChatEvent::Unsupported { event_type: "sticker".to_owned() }),
            Ok(None),
        ]));

        let runner = ChatRunner::new(transport.clone(), echo_dispatcher());
        runner.start().await.expect("runner");

        assert_eq!(transport.acknowledgements().await, vec!["env-1", "env-2"]);
        assert_eq!(transport.sent().await, vec![(ChatKey::new(3, 4), "echo hi".to_owned())]);
        assert!(transport.disconnected().await);
    }

    #[tokio::test]
    async fn handler_failures_reply_with_an_error_and_keep_reading() {
        let transport = Arc::new(ScriptedTransport::with_envelopes(vec![
            envelope("env-1", ChatEvent::from_text("fail")),
            envelope("env-2", ChatEvent::from_text("again")),
            Ok(None),
        ]));

        let runner = ChatRunner::new(transport.clone(), echo_dispatcher());
        runner.start().await.expect("handler errors do not stop the runner");

        let sent = transport.sent().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].1, "That did not work. Please try again.");
        assert_eq!(sent[1].1, "echo again");
    }

    #[tokio::test]
    async fn connect_failure_is_returned_without_reading() {
        let transport =
            Arc::new(ScriptedTransport::refusing(TransportError::Connect("network down".to_owned())));

        let runner = ChatRunner::new(transport.clone(), EventDispatcher::default());
        let result = runner.start().await;

        assert_eq!(result, Err(TransportError::Connect("network down".to_owned())));
        assert!(transport.acknowledgements().await.is_empty());
    }

    #[tokio::test]
    async fn read_failure_ends_the_run_after_earlier_replies() {
        let transport = Arc::new(ScriptedTransport::with_envelopes(vec![
            envelope("env-1", ChatEvent::from_text("hi")),
            Err(TransportError::Receive("socket closed".to_owned())),
        ]));

        let runner = ChatRunner::new(transport.clone(), echo_dispatcher());
        let result = runner.start().await;

        assert_eq!(result, Err(TransportError::Receive("socket closed".to_owned())));
        assert_eq!(transport.sent().await, vec![(ChatKey::new(3, 4), "echo hi".to_owned())]);
        assert!(!transport.disconnected().await);
    }
}
