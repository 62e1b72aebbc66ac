use movequote_core::flows::UserAction;
use thiserror::Error;

use crate::blocks::MessageTemplate;
use crate::events::{ChatKey, EventContext, EventHandlerError};
use crate::service::ChatService;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandPayload {
    /// Raw command text as typed, e.g. `/start@movequote_bot`.
    pub text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatCommand {
    Start,
    Restart,
    Cancel,
    Prices,
    UpdatePrices,
    Help,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("not a command: {0}")]
    NotACommand(String),
    #[error("unsupported command: {0}")]
    UnsupportedCommand(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("command service failed: {0}")]
    Service(String),
}

/// Parses `/name` or `/name@bot`, ignoring anything after the first word.
pub fn parse_command(text: &str) -> Result<ChatCommand, CommandParseError> {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix('/') else {
        return Err(CommandParseError::NotACommand(trimmed.to_owned()));
    };
    let word = body.split_whitespace().next().unwrap_or_default();
    let name = word.split_once('@').map_or(word, |(name, _)| name).to_ascii_lowercase();

    match name.as_str() {
        "start" => Ok(ChatCommand::Start),
        "restart" => Ok(ChatCommand::Restart),
        "cancel" => Ok(ChatCommand::Cancel),
        "prices" => Ok(ChatCommand::Prices),
        "update_prices" => Ok(ChatCommand::UpdatePrices),
        "help" => Ok(ChatCommand::Help),
        _ => Err(CommandParseError::UnsupportedCommand(format!("/{name}"))),
    }
}

pub struct CommandRouter<S> {
    service: S,
}

impl<S> CommandRouter<S>
where
    S: ChatService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub async fn route(
        &self,
        key: ChatKey,
        command: ChatCommand,
        ctx: &EventContext,
    ) -> Result<Vec<MessageTemplate>, EventHandlerError> {
        match command {
            ChatCommand::Start | ChatCommand::Restart => {
                self.service.act(key, UserAction::Start, ctx).await
            }
            ChatCommand::Cancel => self.service.act(key, UserAction::Cancel, ctx).await,
            ChatCommand::Prices => self.service.show_prices(key, ctx).await,
            ChatCommand::UpdatePrices => self.service.update_prices(key, ctx).await,
            ChatCommand::Help => Ok(vec![self.service.help(key)]),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use movequote_core::flows::UserAction;

    use super::{parse_command, ChatCommand, CommandParseError, CommandRouter};
    use crate::blocks::{notice_message, MessageTemplate};
    use crate::events::{ChatKey, EventContext, EventHandlerError};
    use crate::service::ChatService;

    #[derive(Default)]
    struct RecordingService {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingService {
        fn record(&self, call: String) -> Vec<MessageTemplate> {
            self.calls.lock().expect("calls lock").push(call.clone());
            vec![notice_message(&call)]
        }
    }

    #[async_trait]
    impl ChatService for RecordingService {
        async fn act(
            &self,
            _key: ChatKey,
            action: UserAction,
            _ctx: &EventContext,
        ) -> Result<Vec<MessageTemplate>, EventHandlerError> {
            Ok(self.record(format!("act:{}", action.describe())))
        }

        async fn show_prices(
            &self,
            _key: ChatKey,
            _ctx: &EventContext,
        ) -> Result<Vec<MessageTemplate>, EventHandlerError> {
            Ok(self.record("prices".to_owned()))
        }

        async fn update_prices(
            &self,
            _key: ChatKey,
            _ctx: &EventContext,
        ) -> Result<Vec<MessageTemplate>, EventHandlerError> {
            Ok(self.record("update_prices".to_owned()))
        }

        fn help(&self, _key: ChatKey) -> MessageTemplate {
            notice_message("help")
        }
    }

    #[test]
    fn parses_known_commands_with_bot_suffix_and_arguments() {
        assert_eq!(parse_command("/start"), Ok(ChatCommand::Start));
        assert_eq!(parse_command("  /Restart@movequote_bot  "), Ok(ChatCommand::Restart));
        assert_eq!(parse_command("/cancel now please"), Ok(ChatCommand::Cancel));
        assert_eq!(parse_command("/update_prices"), Ok(ChatCommand::UpdatePrices));
    }

    #[test]
    fn rejects_plain_text_and_unknown_commands() {
        assert_eq!(
            parse_command("hello"),
            Err(CommandParseError::NotACommand("hello".to_owned()))
        );
        assert_eq!(
            parse_command("/quote new"),
            Err(CommandParseError::UnsupportedCommand("/quote".to_owned()))
        );
    }

    #[tokio::test]
    async fn router_maps_commands_to_service_calls() {
        let router = CommandRouter::new(RecordingService::default());
        let key = ChatKey::new(1, 2);
        let ctx = EventContext::default();

        for command in [
            ChatCommand::Start,
            ChatCommand::Restart,
            ChatCommand::Cancel,
            ChatCommand::Prices,
            ChatCommand::UpdatePrices,
        ] {
            router.route(key, command, &ctx).await.expect("route");
        }
        let help = router.route(key, ChatCommand::Help, &ctx).await.expect("help");

        assert_eq!(help[0].fallback_text, "help");
        assert_eq!(
            *router.service().calls.lock().expect("calls lock"),
            vec!["act:start", "act:start", "act:cancel", "prices", "update_prices"]
        );
    }
}
