//! Tributary: oracle-routed natural-language data query service.
//!
//! Queries are routed by a reasoning oracle to one of the registered
//! data retrievers, or to a join-compatible pair of tabular retrievers
//! whose results are inner-joined into one answer. Every successful
//! retrieval is recorded as an annotation in an age-bounded store.

pub mod annotation;
pub mod api;
pub mod config;
pub mod error;
pub mod frame;
pub mod metrics;
pub mod oracle;
pub mod retriever;
pub mod system;

pub use annotation::{Annotation, AnnotationStore, Payload, TextAnswer};
pub use api::{create_rest_router, ApiState, RestApiConfig};
pub use config::Config;
pub use error::{
    ConfigError, FrameError, OracleError, Result, RetrieverError, TributaryError,
};
pub use frame::DataFrame;
pub use metrics::{get_metrics, Metrics};
pub use oracle::{
    ApiOracle, JoinKeys, Oracle, Selection, SourceCapability, SourceDescriptor,
};
pub use retriever::{
    DataFrameRetriever, HttpDataFrameRetriever, HttpTextRetriever, TableRetriever, TextRetriever,
};
pub use system::{DataSystem, JoinFailurePolicy};
