//! Annotation value objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::frame::DataFrame;

/// A free-text answer from a text retriever.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnswer {
    pub text: String,
}

impl TextAnswer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// The result carried by an annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    Table(DataFrame),
    Text(TextAnswer),
}

impl Payload {
    /// Whether this payload carries no usable data.
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Table(frame) => frame.is_empty(),
            Payload::Text(answer) => answer.is_blank(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Table(_) => "table",
            Payload::Text(_) => "text",
        }
    }
}

/// One stored retrieval result, with provenance and a creation timestamp.
///
/// Annotations are immutable once created: the orchestrator builds one
/// after a successful retrieval, appends it to the store, and hands a
/// clone to the caller. The composite `source` label `"A + B"` marks a
/// two-source join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub id: Uuid,
    /// Name of the retriever that produced the payload, or a composite
    /// label when two sources were joined.
    pub source: String,
    /// The query that produced this result.
    pub query: String,
    pub payload: Payload,
    pub created_at: DateTime<Utc>,
}

impl Annotation {
    pub fn new(source: impl Into<String>, query: impl Into<String>, payload: Payload) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.into(),
            query: query.into(),
            payload,
            created_at: Utc::now(),
        }
    }

    /// Age of this annotation relative to now.
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.created_at
    }
}
