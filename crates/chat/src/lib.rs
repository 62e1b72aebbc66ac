//! Chat interface for movequote
//!
//! This crate turns chat updates into dialog actions and renders the replies:
//! - **Runner** (`runner`) - single-connection transport loop
//! - **Commands** (`commands`) - `/start`, `/restart`, `/cancel`, `/prices`, `/update_prices`
//! - **Events** (`events`) - text messages, button presses and the dispatcher
//! - **Messages** (`blocks`) - prompts with buttons, quotes, price lists
//! - **Sessions** (`sessions`) - one dialog session per chat and user
//!
//! # Architecture
//!
//! ```text
//! Transport → ChatRunner → EventDispatcher → ConversationService → DialogController
//!                                                  ↓
//!                               MessageTemplate ← DialogReply
//! ```
//!
//! # Key Types
//!
//! - `ChatRunner` - pumps updates from one transport connection
//! - `EventDispatcher` - routes events to handlers
//! - `ConversationService` - drives one dialog step per update
//! - `SessionRegistry` - concurrent map of live sessions

pub mod blocks;
pub mod commands;
pub mod events;
pub mod runner;
pub mod service;
pub mod sessions;

pub use blocks::{MessageBuilder, MessageTemplate};
pub use events::{conversation_dispatcher, ChatEnvelope, ChatEvent, ChatKey, EventContext, EventDispatcher};
pub use runner::{ChatRunner, ChatTransport, NoopChatTransport, TransportError};
pub use service::{ChatService, ConversationService};
pub use sessions::SessionRegistry;
