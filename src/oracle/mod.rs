//! The reasoning oracle seam.
//!
//! Routing decisions are delegated to an oracle behind a narrow
//! [`Oracle`] trait: given the query and a capability listing of every
//! registered retriever, it picks one source, a join-compatible pair, or
//! nothing. Keeping the seam this narrow makes the router testable with
//! a deterministic fake in place of the LLM-backed implementation.

pub mod api;

pub use api::ApiOracle;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::OracleError;

/// What a candidate source can answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCapability {
    /// Tabular output.
    Frame,
    /// Free-text output.
    Text,
}

impl SourceCapability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Frame => "frame",
            Self::Text => "text",
        }
    }
}

/// Capability metadata for one registered retriever, as presented to the
/// oracle. Candidates are addressed by registry `index`, not by name, so
/// two sources that happen to share a name stay distinguishable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub index: usize,
    pub name: String,
    pub capability: SourceCapability,
    pub join_compatible: bool,
}

/// Key columns for an inner join across two tabular results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinKeys {
    pub left_key: String,
    pub right_key: String,
}

/// The oracle's routing decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// One source answers the whole query, possibly through a rewritten
    /// sub-query tailored to it.
    Single { source: usize, query: String },
    /// Two join-compatible tabular sources each answer part of the
    /// query; their results are inner-joined on the given keys.
    Joined {
        left: usize,
        right: usize,
        left_query: String,
        right_query: String,
        keys: JoinKeys,
    },
    /// No registered source applies.
    NoMatch,
}

/// The reasoning component that routes queries to sources.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Decide which source (or pair of sources) should answer `query`.
    async fn select(
        &self,
        query: &str,
        sources: &[SourceDescriptor],
    ) -> Result<Selection, OracleError>;
}
