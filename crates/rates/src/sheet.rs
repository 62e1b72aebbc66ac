use std::time::Duration;

use async_trait::async_trait;
use movequote_core::rates::RateTable;
use regex::Regex;
use reqwest::Client;
use tracing::{info, warn};

use crate::source::{fetch_text, http_client, RateSource, RateSourceError};

/// Spreadsheet CSV export. Column A of each row is one line of the JSON document.
pub struct SheetCsvSource {
    url: String,
    client: Client,
}

impl SheetCsvSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RateSourceError> {
        Ok(Self { url: url.into(), client: http_client(timeout)? })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RateSource for SheetCsvSource {
    fn name(&self) -> &str {
        "sheet"
    }

    async fn fetch(&self) -> Result<RateTable, RateSourceError> {
        let csv_text = fetch_text(&self.client, &self.url).await?;
        info!(event_name = "rates.sheet_fetched", bytes = csv_text.len(), "sheet export received");
        parse_sheet_csv(&csv_text)
    }
}

/// Joins column A into JSON, skipping blank cells and `//` comments.
pub fn collect_column_a(csv_text: &str) -> Result<String, RateSourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(csv_text.as_bytes());

    let mut lines = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|error| RateSourceError::parse("sheet", error.to_string()))?;
        let Some(cell) = record.get(0).map(str::trim) else {
            continue;
        };
        if cell.is_empty() || cell.starts_with("//") {
            continue;
        }
        lines.push(cell.to_string());
    }
    Ok(lines.join("\n"))
}

pub fn parse_sheet_csv(csv_text: &str) -> Result<RateTable, RateSourceError> {
    let json_text = collect_column_a(csv_text)?;
    if json_text.is_empty() {
        return Err(RateSourceError::parse("sheet", "column A is empty"));
    }

    match RateTable::parse_json(&json_text) {
        Ok(table) => Ok(table),
        Err(first_error) => {
            warn!(error = %first_error, "sheet JSON did not parse, retrying with quoted keys");
            let repaired = quote_bare_keys(&json_text)?;
            RateTable::parse_json(&repaired).map_err(|error| {
                RateSourceError::parse(
                    "sheet",
                    format!("{error}. Make sure the JSON is split across rows of column A"),
                )
            })
        }
    }
}

/// Spreadsheets sometimes strip the quotes around keys. Puts them back and unquotes literals.
pub fn quote_bare_keys(json_text: &str) -> Result<String, RateSourceError> {
    let compile = |pattern: &str| {
        Regex::new(pattern).map_err(|error| RateSourceError::parse("sheet", error.to_string()))
    };
    let keys = compile(r"(\w+)(\s*):(\s*)")?;
    let numbers = compile(r#":\s*"(\d+)""#)?;
    let booleans = compile(r#":\s*"(true|false)""#)?;
    let nulls = compile(r#":\s*"(null)""#)?;

    let fixed = keys.replace_all(json_text, r#""${1}"${2}:${3}"#);
    let fixed = numbers.replace_all(&fixed, ": ${1}");
    let fixed = booleans.replace_all(&fixed, ": ${1}");
    let fixed = nulls.replace_all(&fixed, ": ${1}");
    Ok(fixed.into_owned())
}

#[cfg(test)]
mod tests {
    use super::{collect_column_a, parse_sheet_csv, quote_bare_keys};

    #[test]
    fn column_a_is_joined_without_comments() {
        let csv_text = "\"{\",ignored\n// header comment,\n\n\"\"\"boundary_km\"\": 60\",x\n}\n";
        let joined = collect_column_a(csv_text).expect("csv");
        assert_eq!(joined, "{\n\"boundary_km\": 60\n}");
    }

    #[test]
    fn well_formed_sheet_parses_directly() {
        let csv_text = "{\n\"\"\"delivery\"\": {\"\"up_to_1m3\"\": 3000}\"\n}\n";
        let table = parse_sheet_csv(csv_text).expect("table");
        assert_eq!(table.amount("delivery.up_to_1m3"), 3000);
    }

    #[test]
    fn bare_keys_are_repaired() {
        let repaired = quote_bare_keys("{\nboundary_km: 60,\ndelivery: {up_to_1m3: 3000}\n}").expect("repair");
        assert_eq!(repaired, "{\n\"boundary_km\": 60,\n\"delivery\": {\"up_to_1m3\": 3000}\n}");

        let csv_text = "{\nboundary_km: 60\n}\n";
        let table = parse_sheet_csv(csv_text).expect("repaired table");
        assert_eq!(table.amount("boundary_km"), 60);
    }

    #[test]
    fn empty_sheet_is_an_error() {
        let error = parse_sheet_csv("// only a comment\n,\n").expect_err("empty");
        assert!(error.to_string().contains("column A is empty"));
    }

    #[test]
    fn hopeless_sheet_reports_parse_error() {
        let error = parse_sheet_csv("{ this is not json\n").expect_err("broken");
        assert!(error.to_string().starts_with("sheet:"));
    }
}
