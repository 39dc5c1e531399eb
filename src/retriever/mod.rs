//! Retriever contract and the bundled source implementations.

pub mod http;
pub mod table;
pub mod traits;

pub use http::{HttpDataFrameRetriever, HttpTextRetriever};
pub use table::TableRetriever;
pub use traits::{DataFrameRetriever, SharedDataFrameRetriever, SharedTextRetriever, TextRetriever};
