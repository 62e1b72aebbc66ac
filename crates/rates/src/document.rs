use std::time::Duration;

use async_trait::async_trait;
use movequote_core::rates::RateTable;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

use crate::source::{fetch_text, http_client, RateSource, RateSourceError};

/// Keys that mark a JSON object as a rate table when it is embedded in prose.
const MARKER_KEYS: [&str; 2] = ["delivery", "boundary_km"];

/// Text export of a shared document holding the rate table, possibly surrounded by notes.
pub struct DocumentSource {
    url: String,
    client: Client,
}

impl DocumentSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RateSourceError> {
        Ok(Self { url: export_url(&url.into()), client: http_client(timeout)? })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RateSource for DocumentSource {
    fn name(&self) -> &str {
        "document"
    }

    async fn fetch(&self) -> Result<RateTable, RateSourceError> {
        let text = fetch_text(&self.client, &self.url).await?;
        info!(event_name = "rates.document_fetched", bytes = text.len(), "document export received");
        extract_rate_table(&text)
    }
}

/// Editor links are turned into their plain-text export.
pub fn export_url(url: &str) -> String {
    match url.split_once("/edit") {
        Some((base, _)) => format!("{base}/export?format=txt"),
        None => url.to_string(),
    }
}

pub fn extract_rate_table(raw: &str) -> Result<RateTable, RateSourceError> {
    let text = raw.trim().trim_start_matches('\u{feff}');

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            match serde_json::from_str::<Value>(&text[start..=end]) {
                Ok(value @ Value::Object(_)) => return table_from(value),
                Ok(_) | Err(_) => debug!("outermost braces do not hold a JSON object"),
            }
        }
    }

    for candidate in balanced_objects(text) {
        let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(candidate) else {
            continue;
        };
        if MARKER_KEYS.iter().any(|key| value.get(key).is_some()) {
            return table_from(value);
        }
    }

    Err(RateSourceError::parse(
        "document",
        "no rate table JSON found. Paste the contents of prices.json into the document",
    ))
}

fn table_from(value: Value) -> Result<RateTable, RateSourceError> {
    RateTable::from_value(value).map_err(|error| RateSourceError::parse("document", error.to_string()))
}

/// Every `{...}` span with balanced braces, in order of its opening brace.
fn balanced_objects(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();

    for (start, byte) in bytes.iter().enumerate() {
        if *byte != b'{' {
            continue;
        }
        let mut depth = 0_usize;
        for (offset, inner) in bytes[start..].iter().enumerate() {
            match inner {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        spans.push(&text[start..=start + offset]);
                        break;
                    }
                }
                _ => {}
            }
        }
    }
    spans
}
