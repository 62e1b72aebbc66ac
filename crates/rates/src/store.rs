use std::sync::Arc;

use chrono::{DateTime, Utc};
use movequote_core::rates::{compare, PriceChange, RateTable};
use tokio::sync::RwLock;
use tracing::info;

use crate::chain::RateSourceChain;
use crate::source::RateSourceError;

#[derive(Clone, Debug)]
pub struct RateSnapshot {
    pub table: RateTable,
    pub source: String,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct RefreshReport {
    pub source: String,
    /// `None` when there was no previous snapshot to compare against.
    pub changes: Option<Vec<PriceChange>>,
    pub loaded_at: DateTime<Utc>,
}

/// Latest rate table shared by every session. Pricing reads whatever snapshot is current.
pub struct RateStore {
    chain: RateSourceChain,
    current: RwLock<Option<Arc<RateSnapshot>>>,
}

impl RateStore {
    pub fn new(chain: RateSourceChain) -> Self {
        Self { chain, current: RwLock::new(None) }
    }

    /// Store seeded with a table, e.g. one read from disk by the CLI.
    pub fn with_table(chain: RateSourceChain, table: RateTable, source: impl Into<String>) -> Self {
        let snapshot = RateSnapshot { table, source: source.into(), loaded_at: Utc::now() };
        Self { chain, current: RwLock::new(Some(Arc::new(snapshot))) }
    }

    pub fn chain(&self) -> &RateSourceChain {
        &self.chain
    }

    pub async fn current(&self) -> Option<Arc<RateSnapshot>> {
        self.current.read().await.clone()
    }

    /// Current snapshot, loading one first if nothing has been loaded yet.
    pub async fn get_or_load(&self) -> Result<Arc<RateSnapshot>, RateSourceError> {
        if let Some(snapshot) = self.current().await {
            return Ok(snapshot);
        }
        self.refresh().await?;
        self.current().await.ok_or_else(|| RateSourceError::Exhausted(Vec::new()))
    }

    /// Fetches a fresh table and swaps it in. A failed fetch keeps the previous snapshot.
    pub async fn refresh(&self) -> Result<RefreshReport, RateSourceError> {
        let (table, source) = self.chain.fetch().await?;
        let snapshot = Arc::new(RateSnapshot { table, source, loaded_at: Utc::now() });

        let previous = {
            let mut current = self.current.write().await;
            current.replace(Arc::clone(&snapshot))
        };
        let changes = previous.map(|previous| compare(&previous.table, &snapshot.table));

        info!(
            event_name = "rates.refreshed",
            source = %snapshot.source,
            changed = changes.as_ref().map(Vec::len).unwrap_or_default(),
            "rate snapshot replaced"
        );

        Ok(RefreshReport { source: snapshot.source.clone(), changes, loaded_at: snapshot.loaded_at })
    }
}
