use std::time::Duration;

use movequote_core::config::RatesConfig;
use movequote_core::rates::RateTable;
use tracing::{info, warn};

use crate::document::DocumentSource;
use crate::file::FileSource;
use crate::sheet::SheetCsvSource;
use crate::source::{RateSource, RateSourceError};

/// Ordered list of rate sources. The first one that yields a table wins.
pub struct RateSourceChain {
    sources: Vec<Box<dyn RateSource>>,
}

impl RateSourceChain {
    pub fn new(sources: Vec<Box<dyn RateSource>>) -> Self {
        Self { sources }
    }

    /// Sheet, then document, then the local file, skipping sources that are not configured.
    pub fn from_config(config: &RatesConfig) -> Result<Self, RateSourceError> {
        let timeout = Duration::from_secs(config.fetch_timeout_secs);
        let mut sources: Vec<Box<dyn RateSource>> = Vec::new();

        if let Some(url) = config.sheet_url.as_deref().map(str::trim).filter(|url| !url.is_empty()) {
            sources.push(Box::new(SheetCsvSource::new(url, timeout)?));
        }
        if let Some(url) = config.document_url.as_deref().map(str::trim).filter(|url| !url.is_empty())
        {
            sources.push(Box::new(DocumentSource::new(url, timeout)?));
        }
        sources.push(Box::new(FileSource::new(config.fallback_path.clone())));

        Ok(Self::new(sources))
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|source| source.name()).collect()
    }

    /// Returns the table together with the name of the source that produced it.
    pub async fn fetch(&self) -> Result<(RateTable, String), RateSourceError> {
        let mut failures = Vec::new();

        for (position, source) in self.sources.iter().enumerate() {
            match source.fetch().await {
                Ok(table) => {
                    if position > 0 {
                        warn!(
                            event_name = "rates.fallback_used",
                            source = source.name(),
                            skipped = position,
                            "rate table loaded from a fallback source"
                        );
                    }
                    info!(
                        event_name = "rates.loaded",
                        source = source.name(),
                        groups = table.groups().count(),
                        "rate table loaded"
                    );
                    return Ok((table, source.name().to_string()));
                }
                Err(error) => {
                    warn!(
                        event_name = "rates.source_failed",
                        source = source.name(),
                        error = %error,
                        "rate source failed, trying the next one"
                    );
                    failures.push(format!("{}: {error}", source.name()));
                }
            }
        }

        Err(RateSourceError::Exhausted(failures))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use movequote_core::config::RatesConfig;
    use movequote_core::rates::RateTable;
    use serde_json::json;

    use super::RateSourceChain;
    use crate::source::{RateSource, RateSourceError};

    /// Serves a fixed table, or fails, and counts calls.
    pub(crate) struct StaticSource {
        pub name: &'static str,
        pub table: Option<RateTable>,
        pub calls: Arc<AtomicUsize>,
    }

    impl StaticSource {
        pub(crate) fn ok(name: &'static str, value: serde_json::Value) -> Self {
            Self {
                name,
                table: Some(RateTable::from_value(value).expect("fixture table")),
                calls: Arc::default(),
            }
        }

        pub(crate) fn failing(name: &'static str) -> Self {
            Self { name, table: None, calls: Arc::default() }
        }
    }

    #[async_trait]
    impl RateSource for StaticSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self) -> Result<RateTable, RateSourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.table.clone().ok_or_else(|| RateSourceError::Status {
                url: format!("https://{}.example.com", self.name),
                status: 503,
            })
        }
    }

    #[tokio::test]
    async fn first_successful_source_wins() {
        let primary = StaticSource::ok("sheet", json!({"boundary_km": 60}));
        let secondary = StaticSource::ok("file", json!({"boundary_km": 10}));
        let secondary_calls = Arc::clone(&secondary.calls);
        let chain = RateSourceChain::new(vec![Box::new(primary), Box::new(secondary)]);

        let (table, source) = chain.fetch().await.expect("table");
        assert_eq!(source, "sheet");
        assert_eq!(table.amount("boundary_km"), 60);
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failures_fall_through_in_order() {
        let chain = RateSourceChain::new(vec![
            Box::new(StaticSource::failing("sheet")),
            Box::new(StaticSource::failing("document")),
            Box::new(StaticSource::ok("file", json!({"carry_from_parking": 900}))),
        ]);

        let (table, source) = chain.fetch().await.expect("fallback table");
        assert_eq!(source, "file");
        assert_eq!(table.amount("carry_from_parking"), 900);
    }

    #[tokio::test]
    async fn exhausted_chain_reports_each_failure() {
        let chain = RateSourceChain::new(vec![
            Box::new(StaticSource::failing("sheet")),
            Box::new(StaticSource::failing("file")),
        ]);

        match chain.fetch().await {
            Err(RateSourceError::Exhausted(failures)) => {
                assert_eq!(failures.len(), 2);
                assert!(failures[0].starts_with("sheet: "));
                assert!(failures[1].contains("503"));
            }
            other => panic!("expected exhausted chain, got {other:?}"),
        }
    }

    #[test]
    fn config_without_urls_only_uses_the_file() {
        let config = RatesConfig {
            sheet_url: None,
            document_url: Some("  ".to_string()),
            fallback_path: PathBuf::from("prices.json"),
            fetch_timeout_secs: 5,
        };
        let chain = RateSourceChain::from_config(&config).expect("chain");
        assert_eq!(chain.source_names(), vec!["file"]);
    }

    #[test]
    fn config_with_urls_keeps_sheet_document_file_order() {
        let config = RatesConfig {
            sheet_url: Some("https://sheets.example.com/export?format=csv".to_string()),
            document_url: Some("https://docs.example.com/d/abc/edit".to_string()),
            fallback_path: PathBuf::from("prices.json"),
            fetch_timeout_secs: 5,
        };
        let chain = RateSourceChain::from_config(&config).expect("chain");
        assert_eq!(chain.source_names(), vec!["sheet", "document", "file"]);
    }
}
