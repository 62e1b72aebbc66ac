use std::fs;
use std::path::Path;

use movequote_core::domain::QuoteRequest;
use movequote_core::pricing::{DeterministicQuoteEngine, QuoteEngine};

use crate::commands::{currency_label, fetch_rates, rate_chain, CommandResult, EXIT_INPUT, EXIT_INVALID_REQUEST};

const COMMAND: &str = "quote";

pub fn run(request_path: &Path, rates: Option<&Path>) -> CommandResult {
    match price(request_path, rates) {
        Ok(result) | Err(result) => result,
    }
}

fn price(request_path: &Path, rates: Option<&Path>) -> Result<CommandResult, CommandResult> {
    let raw = fs::read_to_string(request_path).map_err(|error| {
        CommandResult::failure(
            COMMAND,
            "input",
            format!("failed to read `{}`: {error}", request_path.display()),
            EXIT_INPUT,
        )
    })?;
    let request: QuoteRequest = serde_json::from_str(&raw).map_err(|error| {
        CommandResult::failure(
            COMMAND,
            "input",
            format!("`{}` is not a quote request: {error}", request_path.display()),
            EXIT_INPUT,
        )
    })?;
    request.validate().map_err(|error| {
        CommandResult::failure(COMMAND, "invalid_request", error.to_string(), EXIT_INVALID_REQUEST)
    })?;

    let chain = rate_chain(COMMAND, rates)?;
    let (table, _source) = fetch_rates(COMMAND, &chain)?;

    let pricing = DeterministicQuoteEngine::new(currency_label()).price(&request, &table);

    Ok(CommandResult::success(COMMAND, pricing.quote.render()))
}
