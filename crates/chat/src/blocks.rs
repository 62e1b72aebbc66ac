use movequote_core::domain::Quote;
use movequote_core::flows::{Choice, Prompt};
use movequote_core::rates::{format_changes, format_price_list, RateTable};
use movequote_rates::RefreshReport;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    Plain { text: String },
    Markdown { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self::Markdown { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text } | Self::Markdown { text } => text,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonElement {
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self { action_id: action_id.into(), text: TextObject::plain(label), style: None }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { block_id: String, text: TextObject },
    Actions { block_id: String, elements: Vec<ButtonElement> },
    Context { block_id: String, elements: Vec<TextObject> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

impl MessageTemplate {
    /// Every action id offered by the message, in display order.
    pub fn action_ids(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .filter_map(|block| match block {
                Block::Actions { elements, .. } => Some(elements),
                _ => None,
            })
            .flatten()
            .map(|button| button.action_id.as_str())
            .collect()
    }

    /// Plain-text rendering for terminals. Buttons become `[label]` rows.
    pub fn render_text(&self) -> String {
        let mut lines = Vec::with_capacity(self.blocks.len());
        for block in &self.blocks {
            match block {
                Block::Section { text, .. } => lines.push(text.text().to_owned()),
                Block::Actions { elements, .. } => lines.push(
                    elements
                        .iter()
                        .map(|button| format!("[{}]", button.text.text()))
                        .collect::<Vec<_>>()
                        .join(" "),
                ),
                Block::Context { elements, .. } => {
                    lines.extend(elements.iter().map(|element| element.text().to_owned()))
                }
            }
        }
        if lines.is_empty() {
            return self.fallback_text.clone();
        }
        lines.join("\n")
    }
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: block_id.into(), text: builder.build() });
        self
    }

    pub fn actions<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ActionsBuilder),
    {
        let mut builder = ActionsBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Actions { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn markdown(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::markdown(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(""))
    }
}

#[derive(Default)]
pub struct ActionsBuilder {
    elements: Vec<ButtonElement>,
}

impl ActionsBuilder {
    pub fn button(&mut self, button: ButtonElement) -> &mut Self {
        self.elements.push(button);
        self
    }

    fn build(self) -> Vec<ButtonElement> {
        self.elements
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

fn highlighted(choice: Choice) -> bool {
    matches!(choice, Choice::StartDelivery | Choice::Yes | Choice::NewQuote)
}

/// Notices first, then the question and one actions block per button row.
pub fn prompt_message(notices: &[String], prompt: Option<&Prompt>) -> MessageTemplate {
    let fallback = prompt
        .map(|prompt| prompt.text.clone())
        .or_else(|| notices.last().cloned())
        .unwrap_or_default();
    let mut builder = MessageBuilder::new(fallback);

    for (index, notice) in notices.iter().enumerate() {
        builder = builder.section(format!("dialog.notice.{index}.v1"), |section| {
            section.plain(notice.clone());
        });
    }

    let Some(prompt) = prompt else {
        return builder.build();
    };

    builder = builder.section("dialog.prompt.v1", |section| {
        section.plain(prompt.text.clone());
    });
    for (index, row) in prompt.rows.iter().enumerate() {
        builder = builder.actions(format!("dialog.actions.{index}.v1"), |actions| {
            for button in row {
                let element = ButtonElement::new(button.choice.action_id(), button.label.clone());
                actions.button(if highlighted(button.choice) {
                    element.style(ButtonStyle::Primary)
                } else {
                    element
                });
            }
        });
    }
    builder.build()
}

pub fn quote_message(quote: &Quote) -> MessageTemplate {
    MessageBuilder::new("Detailed quote")
        .section("quote.header.v1", |section| {
            section.markdown("*Detailed quote*");
        })
        .section("quote.lines.v1", |section| {
            section.plain(quote.render());
        })
        .build()
}

pub fn price_list_message(table: Option<&RateTable>, currency: &str) -> MessageTemplate {
    MessageBuilder::new("Current prices")
        .section("prices.header.v1", |section| {
            section.markdown("*Current prices*");
        })
        .section("prices.list.v1", |section| {
            section.plain(format_price_list(table, currency));
        })
        .build()
}

pub fn rates_refreshed_message(report: &RefreshReport, currency: &str) -> MessageTemplate {
    let changes = match &report.changes {
        Some(changes) => format_changes(changes, currency),
        None => "First load, nothing to compare against".to_owned(),
    };
    MessageBuilder::new(format!("Prices updated from {}", report.source))
        .section("prices.refreshed.v1", |section| {
            section.markdown(format!("*Prices updated* from `{}`", report.source));
        })
        .section("prices.changes.v1", |section| {
            section.plain(changes);
        })
        .context("prices.refreshed.context.v1", |context| {
            context.plain(format!("Loaded at {}", report.loaded_at.format("%Y-%m-%d %H:%M UTC")));
        })
        .build()
}

pub fn notice_message(text: &str) -> MessageTemplate {
    MessageBuilder::new(text.to_owned())
        .section("dialog.notice.0.v1", |section| {
            section.plain(text.to_owned());
        })
        .build()
}

pub fn error_message(summary: &str, correlation_id: &str) -> MessageTemplate {
    MessageBuilder::new(summary.to_owned())
        .section("dialog.error.summary.v1", |section| {
            section.plain(format!("⚠️ {summary}"));
        })
        .context("dialog.error.context.v1", |context| {
            context.plain(format!("Correlation ID: {correlation_id}"));
        })
        .build()
}

pub fn help_message(is_admin: bool) -> MessageTemplate {
    let mut commands = String::from(
        "*Available commands*\n• `/start` new quote\n• `/restart` start over\n• `/cancel` stop the current quote",
    );
    if is_admin {
        commands.push_str("\n• `/prices` show current prices\n• `/update_prices` reload prices");
    }
    MessageBuilder::new("Command help")
        .section("dialog.help.summary.v1", |section| {
            section.markdown(commands);
        })
        .build()
}
