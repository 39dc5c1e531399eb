//! Error types for the Tributary query service.

use thiserror::Error;

/// Main error type for Tributary operations.
#[derive(Error, Debug)]
pub enum TributaryError {
    /// The query was empty or whitespace-only. Rejected before any routing.
    #[error("query must not be empty")]
    EmptyQuery,

    /// No retriever matched the query, or the matched retriever returned
    /// an empty result. This is a normal outcome, not an internal failure.
    #[error("no data found for the query")]
    NoData,

    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("retriever error: {0}")]
    Retriever(#[from] RetrieverError),

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// An oracle call or retriever fetch exceeded its time budget.
    #[error("operation timed out after {0}s")]
    Timeout(u64),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the reasoning oracle.
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("API error: {0}")]
    Api(String),

    /// The oracle replied, but not in the expected format.
    #[error("malformed oracle reply: {0}")]
    Malformed(String),

    /// The oracle named a source that does not exist or cannot serve
    /// the selected role.
    #[error("invalid source selection: {0}")]
    Selection(String),

    #[error("oracle call timed out")]
    Timeout,
}

/// Errors from a retriever fetch.
#[derive(Error, Debug)]
pub enum RetrieverError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("API error: {0}")]
    Api(String),

    /// The source responded, but the payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    #[error("source error: {0}")]
    Source(String),

    #[error("fetch timed out")]
    Timeout,
}

/// Errors from tabular payload construction and joins.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("row width mismatch: expected {expected} cells, got {got}")]
    RowWidth { expected: usize, got: usize },

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("record is not a JSON object")]
    NotAnObject,
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("missing required field: {0}")]
    MissingField(String),
}

/// Result type alias for Tributary operations.
pub type Result<T> = std::result::Result<T, TributaryError>;
