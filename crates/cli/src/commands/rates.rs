use std::path::Path;

use movequote_core::rates::{compare, format_changes, format_price_list};

use crate::commands::{currency_label, fetch_rates, rate_chain, read_rate_file, CommandResult};

pub fn show(rates: Option<&Path>) -> CommandResult {
    let chain = match rate_chain("rates.show", rates) {
        Ok(chain) => chain,
        Err(result) => return result,
    };
    match fetch_rates("rates.show", &chain) {
        Ok((table, source)) => CommandResult::success(
            "rates.show",
            format!("source: {source}\n{}", format_price_list(Some(&table), &currency_label())),
        ),
        Err(result) => result,
    }
}

pub fn diff(old: &Path, new: &Path) -> CommandResult {
    let old_table = match read_rate_file("rates.diff", old) {
        Ok(table) => table,
        Err(result) => return result,
    };
    let new_table = match read_rate_file("rates.diff", new) {
        Ok(table) => table,
        Err(result) => return result,
    };

    let changes = compare(&old_table, &new_table);
    CommandResult::success("rates.diff", format_changes(&changes, &currency_label()))
}
