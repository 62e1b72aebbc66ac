use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use movequote_chat::blocks::Block;
use movequote_chat::{
    conversation_dispatcher, ChatEnvelope, ChatEvent, ChatKey, ChatRunner, ChatTransport,
    ConversationService, MessageTemplate, SessionRegistry, TransportError,
};
use movequote_rates::RateStore;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::sync::Mutex;

use crate::commands::{load_config, rate_chain, runtime, CommandResult};

const COMMAND: &str = "chat";
const CONSOLE_CHAT_ID: i64 = 0;
const USAGE: &str = "Type /start to begin, !N to press button N, /quit to leave.";

/// Console stand-in for a chat platform. Buttons are numbered and pressed with `!N`.
pub struct ConsoleTransport<R, W> {
    input: Mutex<Lines<BufReader<R>>>,
    output: Mutex<W>,
    key: ChatKey,
    buttons: Mutex<Vec<String>>,
    sequence: AtomicU64,
}

impl<R, W> ConsoleTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: R, output: W, key: ChatKey) -> Self {
        Self {
            input: Mutex::new(BufReader::new(input).lines()),
            output: Mutex::new(output),
            key,
            buttons: Mutex::new(Vec::new()),
            sequence: AtomicU64::new(0),
        }
    }

    async fn event_for(&self, line: &str) -> ChatEvent {
        let Some(index) = line.strip_prefix('!') else {
            return ChatEvent::from_text(line);
        };
        let buttons = self.buttons.lock().await;
        let action_id = index
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|number| number.checked_sub(1))
            .and_then(|position| buttons.get(position).cloned())
            .unwrap_or_default();
        ChatEvent::button(action_id)
    }
}

impl<R, W> ConsoleTransport<R, W>
where
    W: AsRef<[u8]>,
{
    /// Everything written so far, for in-memory outputs.
    pub async fn written(&self) -> String {
        String::from_utf8_lossy(self.output.lock().await.as_ref()).into_owned()
    }
}

#[async_trait]
impl<R, W> ChatTransport for ConsoleTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError> {
        loop {
            let line = self
                .input
                .lock()
                .await
                .next_line()
                .await
                .map_err(|error| TransportError::Receive(error.to_string()))?;
            let Some(line) = line else {
                return Ok(None);
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if matches!(line, "/quit" | "/exit") {
                return Ok(None);
            }

            let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
            return Ok(Some(ChatEnvelope {
                envelope_id: format!("console-{sequence}"),
                key: self.key,
                event: self.event_for(line).await,
            }));
        }
    }

    async fn acknowledge(&self, _envelope_id: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send(&self, _key: ChatKey, message: &MessageTemplate) -> Result<(), TransportError> {
        let mut buttons = self.buttons.lock().await;
        let rendered = render_console(message, &mut buttons);
        let mut output = self.output.lock().await;
        output
            .write_all(format!("{rendered}\n\n").as_bytes())
            .await
            .map_err(|error| TransportError::Send(error.to_string()))?;
        output.flush().await.map_err(|error| TransportError::Send(error.to_string()))
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Text with numbered buttons. A message that offers buttons replaces the pressable set.
pub fn render_console(message: &MessageTemplate, buttons: &mut Vec<String>) -> String {
    let mut lines = Vec::new();
    let mut offered = Vec::new();

    for block in &message.blocks {
        match block {
            Block::Section { text, .. } => lines.push(text.text().to_owned()),
            Block::Context { elements, .. } => {
                lines.extend(elements.iter().map(|element| element.text().to_owned()));
            }
            Block::Actions { elements, .. } => {
                let row = elements
                    .iter()
                    .map(|button| {
                        offered.push(button.action_id.clone());
                        format!("[{}] {}", offered.len(), button.text.text())
                    })
                    .collect::<Vec<_>>()
                    .join("   ");
                lines.push(row);
            }
        }
    }

    if !offered.is_empty() {
        *buttons = offered;
    }
    lines.join("\n")
}

pub fn run(rates: Option<&Path>, user_id: i64, admin: bool) -> CommandResult {
    let mut config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(result) => return result,
    };
    if admin && !config.admin.is_admin(user_id) {
        config.admin.user_ids.push(user_id);
    }
    let chain = match rate_chain(COMMAND, rates) {
        Ok(chain) => chain,
        Err(result) => return result,
    };
    let runtime = match runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let service = Arc::new(ConversationService::from_config(
        &config,
        Arc::new(RateStore::new(chain)),
        Arc::new(SessionRegistry::new()),
    ));
    let transport = Arc::new(ConsoleTransport::new(
        tokio::io::stdin(),
        tokio::io::stdout(),
        ChatKey::new(CONSOLE_CHAT_ID, user_id),
    ));
    let runner = ChatRunner::new(transport, conversation_dispatcher(service));

    println!("{USAGE}");
    match runtime.block_on(runner.start()) {
        Ok(()) => CommandResult::success(COMMAND, "console session closed"),
        Err(error) => CommandResult::failure(COMMAND, "transport", error.to_string(), 1),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use movequote_chat::blocks::prompt_message;
    use movequote_chat::{
        conversation_dispatcher, ChatEvent, ChatKey, ChatRunner, ChatTransport,
        ConversationService, SessionRegistry,
    };
    use movequote_core::config::AdminConfig;
    use movequote_core::flows::{Button, Choice, DialogController, Prompt};
    use movequote_core::pricing::DeterministicQuoteEngine;
    use movequote_core::rates::RateTable;
    use movequote_rates::{RateSourceChain, RateStore};
    use serde_json::json;

    use super::{render_console, ConsoleTransport};

    #[test]
    fn buttons_are_numbered_across_rows() {
        let prompt = Prompt::choices("Lifting needed?")
            .row(vec![Button::new(Choice::Yes, "Yes"), Button::new(Choice::No, "No")])
            .button(Choice::Back, "⬅ Back");
        let mut buttons = Vec::new();

        let rendered = render_console(&prompt_message(&[], Some(&prompt)), &mut buttons);

        assert_eq!(rendered, "Lifting needed?\n[1] Yes   [2] No\n[3] ⬅ Back");
        assert_eq!(buttons, vec!["yes", "no", "back"]);
    }

    #[test]
    fn text_only_messages_keep_previous_buttons() {
        let mut buttons = vec!["yes".to_owned()];
        render_console(&prompt_message(&["Added: Armchair".to_owned()], None), &mut buttons);
        assert_eq!(buttons, vec!["yes"]);
    }

    #[tokio::test]
    async fn bang_numbers_press_buttons_and_quit_ends_input() {
        let transport = ConsoleTransport::new(
            "!2\n\nhello\n!9\n/quit\n/start\n".as_bytes(),
            Vec::new(),
            ChatKey::new(0, 1),
        );
        *transport.buttons.lock().await = vec!["menu:delivery".to_owned(), "menu:storage".to_owned()];

        let first = transport.next_envelope().await.expect("read").expect("envelope");
        assert_eq!(first.event, ChatEvent::button("menu:storage"));
        assert_eq!(first.envelope_id, "console-1");

        let second = transport.next_envelope().await.expect("read").expect("envelope");
        assert_eq!(second.event, ChatEvent::from_text("hello"));

        let third = transport.next_envelope().await.expect("read").expect("envelope");
        assert_eq!(third.event, ChatEvent::button(""));

        assert!(transport.next_envelope().await.expect("read").is_none());
    }

    #[tokio::test]
    async fn console_session_prices_a_storage_quote() {
        let table = RateTable::from_value(json!({"storage": {"per_day_per_m3": 10}})).expect("table");
        let service = Arc::new(ConversationService::new(
            DialogController::new(DeterministicQuoteEngine::new("RUB")),
            Arc::new(RateStore::with_table(RateSourceChain::new(Vec::new()), table, "file")),
            Arc::new(SessionRegistry::new()),
            AdminConfig::default(),
        ));
        let transport = Arc::new(ConsoleTransport::new(
            "/start\n!2\n30\n4\n/quit\n".as_bytes(),
            Vec::new(),
            ChatKey::new(0, 1),
        ));
        let runner = ChatRunner::new(transport.clone(), conversation_dispatcher(service));

        runner.start().await.expect("runner");

        let written = transport.written().await;
        assert!(written.contains("[1] Delivery quote"), "{written}");
        assert!(written.contains("TOTAL: 1 200 RUB"), "{written}");
    }
}
