pub mod engine;
pub mod session;
pub mod states;
pub mod validation;

pub use engine::{DialogController, DialogError, DialogReply};
pub use session::{FurnitureDraft, SessionState, DEFAULT_SESSION_TIMEOUT_SECS};
pub use states::{Button, Choice, DialogEffect, DialogState, Prompt, UserAction};
pub use validation::InputError;
