//! Retriever over an in-memory table.
//!
//! Serves datasets small enough to hold resident: the whole table is the
//! answer for any query against the source, and sub-query interpretation
//! is left to the oracle's join-key selection. Tables load from a JSON
//! records file at startup.

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, RetrieverError};
use crate::frame::DataFrame;

use super::traits::DataFrameRetriever;

/// A dataframe retriever backed by a resident table.
pub struct TableRetriever {
    name: String,
    frame: DataFrame,
    join_compatible: bool,
}

impl TableRetriever {
    pub fn new(name: impl Into<String>, frame: DataFrame) -> Self {
        Self {
            name: name.into(),
            frame,
            join_compatible: false,
        }
    }

    /// Load the table from a file holding a JSON array of row-objects.
    pub fn from_records_file(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let records: Vec<Value> = serde_json::from_str(&content)?;
        let frame = DataFrame::from_records(&records)?;
        Ok(Self::new(name, frame))
    }

    /// Mark this source's output as joinable with another compatible
    /// source's output.
    pub fn with_join_compatible(mut self, join_compatible: bool) -> Self {
        self.join_compatible = join_compatible;
        self
    }
}

#[async_trait]
impl DataFrameRetriever for TableRetriever {
    fn name(&self) -> &str {
        &self.name
    }

    fn join_compatible(&self) -> bool {
        self.join_compatible
    }

    async fn fetch(&self, _query: &str) -> std::result::Result<Option<DataFrame>, RetrieverError> {
        if self.frame.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.frame.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_fetch_returns_whole_table() {
        let frame = DataFrame::from_records(&[
            json!({"name": "Alpha", "capacity_mw": 120}),
            json!({"name": "Beta", "capacity_mw": 85}),
        ])
        .unwrap();
        let retriever = TableRetriever::new("Energy Atlas", frame);

        let result = retriever.fetch("solar plants in Ohio").await.unwrap();
        assert_eq!(result.unwrap().num_rows(), 2);
    }

    #[tokio::test]
    async fn test_empty_table_is_no_match() {
        let frame = DataFrame::new(vec!["name".to_string()], vec![]).unwrap();
        let retriever = TableRetriever::new("Energy Atlas", frame);

        assert!(retriever.fetch("anything").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_from_records_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"county": "Ross", "river": "Scioto"}}, {{"county": "Athens", "river": "Hocking"}}]"#
        )
        .unwrap();

        let retriever = TableRetriever::from_records_file("WEN-OKN Database", file.path())
            .unwrap()
            .with_join_compatible(true);

        assert!(retriever.join_compatible());
        let frame = retriever.fetch("rivers").await.unwrap().unwrap();
        assert_eq!(frame.columns(), &["county", "river"]);
        assert_eq!(frame.num_rows(), 2);
    }

    #[test]
    fn test_from_records_file_missing() {
        let result = TableRetriever::from_records_file("X", "/nonexistent/records.json");
        assert!(result.is_err());
    }
}
