pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod pricing;
pub mod rates;

pub use audit::{AuditContext, AuditEvent, AuditSink, InMemoryAuditSink, NoopAuditSink};
pub use config::{AppConfig, ConfigError, LoadOptions};
pub use domain::{FurnitureItem, FurnitureKind, Quote, QuoteLine, QuoteRequest, Zone};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{
    Choice, DialogController, DialogEffect, DialogError, DialogReply, DialogState, Prompt,
    SessionState, UserAction,
};
pub use pricing::{DeterministicQuoteEngine, PricingResult, QuoteEngine};
pub use rates::{PriceChange, RateTable};
