pub mod chat;
pub mod config;
pub mod doctor;
pub mod quote;
pub mod rates;

use std::path::Path;

use movequote_core::config::{AppConfig, LoadOptions};
use movequote_core::pricing::DEFAULT_CURRENCY;
use movequote_core::rates::RateTable;
use movequote_rates::{FileSource, RateSourceChain};
use serde::Serialize;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_INPUT: u8 = 3;
pub const EXIT_RATES: u8 = 4;
pub const EXIT_INVALID_REQUEST: u8 = 5;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(command, "config_validation", error.to_string(), EXIT_CONFIG)
    })
}

/// Currency label from config. The label is cosmetic, so an unloadable config falls back to the default.
pub(crate) fn currency_label() -> String {
    AppConfig::load(LoadOptions::default())
        .map(|config| config.chat.currency_label)
        .unwrap_or_else(|_| DEFAULT_CURRENCY.to_owned())
}

/// A single file source when `--rates` is given, otherwise the configured chain.
pub(crate) fn rate_chain(command: &str, rates: Option<&Path>) -> Result<RateSourceChain, CommandResult> {
    if let Some(path) = rates {
        return Ok(RateSourceChain::new(vec![Box::new(FileSource::new(path))]));
    }
    let config = load_config(command)?;
    RateSourceChain::from_config(&config.rates).map_err(|error| {
        CommandResult::failure(command, "rates_unavailable", error.to_string(), EXIT_RATES)
    })
}

pub(crate) fn runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime",
            format!("failed to initialize async runtime: {error}"),
            1,
        )
    })
}

pub(crate) fn fetch_rates(command: &str, chain: &RateSourceChain) -> Result<(RateTable, String), CommandResult> {
    runtime(command)?.block_on(chain.fetch()).map_err(|error| {
        CommandResult::failure(command, "rates_unavailable", error.to_string(), EXIT_RATES)
    })
}

pub(crate) fn read_rate_file(command: &str, path: &Path) -> Result<RateTable, CommandResult> {
    let raw = std::fs::read_to_string(path).map_err(|error| {
        CommandResult::failure(
            command,
            "input",
            format!("failed to read `{}`: {error}", path.display()),
            EXIT_INPUT,
        )
    })?;
    RateTable::parse_json(raw.trim_start_matches('\u{feff}')).map_err(|error| {
        CommandResult::failure(
            command,
            "input",
            format!("`{}` is not a rate table: {error}", path.display()),
            EXIT_INPUT,
        )
    })
}
