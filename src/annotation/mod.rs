//! Retrieval results and their bounded, age-expiring store.

pub mod store;
pub mod types;

pub use store::AnnotationStore;
pub use types::{Annotation, Payload, TextAnswer};
