//! Configuration loading and validation.

pub mod settings;

pub use settings::{Config, OracleConfig, RetrieverConfig, RetrieverKind, ServerConfig, StoreConfig};
