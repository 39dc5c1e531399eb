//! Retriever trait definitions.
//!
//! A retriever wraps one named data source. There are exactly two
//! capability shapes: tabular ([`DataFrameRetriever`]) and free-text
//! ([`TextRetriever`]). Both expose a single `fetch` operation that
//! returns `Ok(None)` for "no data" and reserves `Err` for genuine
//! failure. Implementations must be safe to call repeatedly and must
//! not carry per-query mutable state between calls.

use std::sync::Arc;

use async_trait::async_trait;

use crate::annotation::TextAnswer;
use crate::error::RetrieverError;
use crate::frame::DataFrame;

/// A retriever whose source answers with tabular data.
#[async_trait]
pub trait DataFrameRetriever: Send + Sync {
    /// Human-readable name of the backing source.
    fn name(&self) -> &str;

    /// Whether this source's tables can be inner-joined with another
    /// join-compatible source's tables to answer one query.
    fn join_compatible(&self) -> bool {
        false
    }

    /// Attempt to answer `query` with a table. `Ok(None)` means the
    /// source has no answer; `Err` is reserved for genuine failure.
    async fn fetch(&self, query: &str) -> Result<Option<DataFrame>, RetrieverError>;
}

/// A retriever whose source answers with free text.
#[async_trait]
pub trait TextRetriever: Send + Sync {
    /// Human-readable name of the backing source.
    fn name(&self) -> &str;

    /// Attempt to answer `query` with free text. `Ok(None)` means the
    /// source has no answer; `Err` is reserved for genuine failure.
    async fn fetch(&self, query: &str) -> Result<Option<TextAnswer>, RetrieverError>;
}

/// Shared handles for dynamic dispatch over heterogeneous retrievers.
pub type SharedDataFrameRetriever = Arc<dyn DataFrameRetriever>;
pub type SharedTextRetriever = Arc<dyn TextRetriever>;
