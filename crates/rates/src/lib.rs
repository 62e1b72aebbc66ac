//! Rate table retrieval.
//!
//! Rate tables are JSON documents published in one of three places:
//! - **Sheet** (`sheet`) - CSV export where column A holds the JSON, one fragment per row
//! - **Document** (`document`) - plain-text export with the JSON somewhere in the body
//! - **File** (`file`) - a local `prices.json` kept as the last resort
//!
//! `RateSourceChain` tries them in order and `RateStore` keeps the latest snapshot so the
//! dialogue never waits on the network while pricing.

pub mod chain;
pub mod document;
pub mod file;
pub mod sheet;
pub mod source;
pub mod store;

pub use chain::RateSourceChain;
pub use document::DocumentSource;
pub use file::FileSource;
pub use sheet::SheetCsvSource;
pub use source::{RateSource, RateSourceError};
pub use store::{RateSnapshot, RateStore, RefreshReport};
