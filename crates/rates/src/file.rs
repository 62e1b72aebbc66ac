use std::path::{Path, PathBuf};

use async_trait::async_trait;
use movequote_core::rates::RateTable;

use crate::source::{RateSource, RateSourceError};

/// Local copy of the rate table. May be out of date, so it is tried last.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RateSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch(&self) -> Result<RateTable, RateSourceError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| RateSourceError::ReadFile { path: self.path.clone(), source })?;
        RateTable::parse_json(raw.trim_start_matches('\u{feff}'))
            .map_err(|error| RateSourceError::parse("file", error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::FileSource;
    use crate::source::{RateSource, RateSourceError};

    #[tokio::test]
    async fn reads_local_price_file() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("prices.json");
        fs::write(&path, r#"{"carry_from_parking": 1500}"#).expect("write prices");

        let table = FileSource::new(&path).fetch().await.expect("table");
        assert_eq!(table.amount("carry_from_parking"), 1500);
    }

    #[tokio::test]
    async fn missing_file_names_the_path() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("absent.json");

        let error = FileSource::new(&path).fetch().await.expect_err("missing");
        assert!(matches!(error, RateSourceError::ReadFile { .. }));
        assert!(error.to_string().contains("absent.json"));
    }

    #[tokio::test]
    async fn malformed_file_is_a_parse_error() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("prices.json");
        fs::write(&path, "[1, 2, 3]").expect("write prices");

        let error = FileSource::new(&path).fetch().await.expect_err("not an object");
        assert!(matches!(error, RateSourceError::Parse { .. }));
    }
}
