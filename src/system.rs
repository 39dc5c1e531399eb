//! The data system: retriever registry, query routing, and result
//! combination.
//!
//! One [`DataSystem`] instance serves the whole process. Retrievers are
//! registered at startup and live for the process lifetime; each request
//! runs the same synchronous pipeline: consult the oracle, fetch from the
//! selected source(s), optionally inner-join two tabular results, record
//! the outcome as an [`Annotation`], and return it. The two legs of a
//! join are fetched sequentially, never concurrently, so oracle-guided
//! sub-query handling stays deterministic.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::annotation::{Annotation, AnnotationStore, Payload, TextAnswer};
use crate::config::{Config, RetrieverKind};
use crate::error::{OracleError, Result, RetrieverError, TributaryError};
use crate::frame::DataFrame;
use crate::metrics::get_metrics;
use crate::oracle::{ApiOracle, JoinKeys, Oracle, Selection, SourceCapability, SourceDescriptor};
use crate::retriever::{
    HttpDataFrameRetriever, HttpTextRetriever, SharedDataFrameRetriever, SharedTextRetriever,
    TableRetriever,
};

/// What to do when one leg of a two-source join fails to fetch.
///
/// `Degrade` prefers an explicit "no data" outcome over exposing an
/// internal fetch error whenever a plausible non-error reading exists;
/// `Error` surfaces the underlying retriever failure. Timeouts are
/// always surfaced as timeouts, regardless of policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinFailurePolicy {
    #[default]
    Degrade,
    Error,
}

/// Orchestrates retrievers, the oracle, and the annotation store.
pub struct DataSystem {
    oracle: Arc<dyn Oracle>,
    dataframe_retrievers: Vec<SharedDataFrameRetriever>,
    text_retrievers: Vec<SharedTextRetriever>,
    store: AnnotationStore,
    oracle_timeout: Duration,
    fetch_timeout: Duration,
    join_failure_policy: JoinFailurePolicy,
}

impl DataSystem {
    /// Create a system with default timeouts and join policy.
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            dataframe_retrievers: Vec::new(),
            text_retrievers: Vec::new(),
            store: AnnotationStore::new(),
            oracle_timeout: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(30),
            join_failure_policy: JoinFailurePolicy::default(),
        }
    }

    /// Build the full system from configuration: the API oracle plus
    /// every configured retriever, registered in listed order.
    pub fn from_config(config: &Config) -> Result<Self> {
        let oracle = ApiOracle::from_config(&config.oracle)?;
        let fetch_timeout = Duration::from_secs(config.server.request_timeout_secs);

        let mut system = Self::new(Arc::new(oracle))
            .with_timeouts(Duration::from_secs(config.oracle.timeout_secs), fetch_timeout)
            .with_join_failure_policy(config.store.join_failure_policy);

        for retriever in &config.retrievers {
            match retriever.kind {
                RetrieverKind::Table => {
                    let path = retriever.path.as_ref().ok_or_else(|| {
                        TributaryError::Config(crate::error::ConfigError::MissingField(format!(
                            "retrievers.{}.path",
                            retriever.name
                        )))
                    })?;
                    let table = TableRetriever::from_records_file(&retriever.name, path)?
                        .with_join_compatible(retriever.join_compatible);
                    system.add_dataframe_retriever(Arc::new(table));
                }
                RetrieverKind::HttpFrame => {
                    let url = retriever.url.as_ref().ok_or_else(|| {
                        TributaryError::Config(crate::error::ConfigError::MissingField(format!(
                            "retrievers.{}.url",
                            retriever.name
                        )))
                    })?;
                    let http = HttpDataFrameRetriever::new(&retriever.name, url, fetch_timeout)?
                        .with_join_compatible(retriever.join_compatible);
                    system.add_dataframe_retriever(Arc::new(http));
                }
                RetrieverKind::HttpText => {
                    let url = retriever.url.as_ref().ok_or_else(|| {
                        TributaryError::Config(crate::error::ConfigError::MissingField(format!(
                            "retrievers.{}.url",
                            retriever.name
                        )))
                    })?;
                    let http = HttpTextRetriever::new(&retriever.name, url, fetch_timeout)?;
                    system.add_text_retriever(Arc::new(http));
                }
            }
        }

        Ok(system)
    }

    /// Override the oracle and per-fetch time budgets.
    pub fn with_timeouts(mut self, oracle_timeout: Duration, fetch_timeout: Duration) -> Self {
        self.oracle_timeout = oracle_timeout;
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn with_join_failure_policy(mut self, policy: JoinFailurePolicy) -> Self {
        self.join_failure_policy = policy;
        self
    }

    /// Register a dataframe retriever. Registration order is priority:
    /// when the oracle is torn between equally plausible sources it is
    /// instructed to pick the earliest-registered one. Duplicate names
    /// are permitted; routing addresses sources by registry index.
    pub fn add_dataframe_retriever(&mut self, retriever: SharedDataFrameRetriever) {
        self.dataframe_retrievers.push(retriever);
    }

    /// Register a text retriever.
    pub fn add_text_retriever(&mut self, retriever: SharedTextRetriever) {
        self.text_retrievers.push(retriever);
    }

    pub fn dataframe_retriever_count(&self) -> usize {
        self.dataframe_retrievers.len()
    }

    pub fn text_retriever_count(&self) -> usize {
        self.text_retrievers.len()
    }

    /// The annotation store, for size inspection and listing.
    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    /// Age-based eviction primitive: drop every stored annotation older
    /// than `seconds`. When to call this is the caller's policy.
    pub fn remove_annotations_older_than(&self, seconds: u64) -> usize {
        let removed = self.store.remove_older_than(Duration::from_secs(seconds));
        if removed > 0 {
            info!(removed, seconds, "pruned expired annotations");
            get_metrics().annotations_pruned_total.inc_by(removed as u64);
        }
        get_metrics().annotations_count.set(self.store.len() as i64);
        removed
    }

    /// Capability listing for the oracle: dataframe retrievers first, in
    /// registration order, then text retrievers.
    fn descriptors(&self) -> Vec<SourceDescriptor> {
        let frames = self.dataframe_retrievers.iter().map(|r| {
            (
                r.name().to_string(),
                SourceCapability::Frame,
                r.join_compatible(),
            )
        });
        let texts = self
            .text_retrievers
            .iter()
            .map(|r| (r.name().to_string(), SourceCapability::Text, false));

        frames
            .chain(texts)
            .enumerate()
            .map(|(index, (name, capability, join_compatible))| SourceDescriptor {
                index,
                name,
                capability,
                join_compatible,
            })
            .collect()
    }

    /// Answer one query: route it, fetch, optionally join, store the
    /// resulting annotation, and return it.
    ///
    /// "No data" outcomes surface as [`TributaryError::NoData`]; oracle
    /// and retriever failures are re-classified into their own error
    /// kinds and never propagate raw. Nothing is stored on any failure
    /// path.
    pub async fn process_request(&self, query: &str) -> Result<Annotation> {
        let metrics = get_metrics();
        metrics.queries_total.inc();
        let start = Instant::now();

        let result = self.route(query).await;
        metrics
            .query_duration_seconds
            .observe(start.elapsed().as_secs_f64());

        match &result {
            Ok(annotation) => {
                metrics.annotations_count.set(self.store.len() as i64);
                info!(source = %annotation.source, "query answered");
            }
            Err(TributaryError::NoData) => metrics.queries_no_data_total.inc(),
            Err(TributaryError::Oracle(_)) => metrics.oracle_failures_total.inc(),
            Err(TributaryError::Retriever(_)) => metrics.retriever_failures_total.inc(),
            Err(_) => {}
        }

        result
    }

    async fn route(&self, query: &str) -> Result<Annotation> {
        let query = query.trim();
        if query.is_empty() {
            return Err(TributaryError::EmptyQuery);
        }

        let sources = self.descriptors();
        if sources.is_empty() {
            debug!("no retrievers registered");
            return Err(TributaryError::NoData);
        }

        let selection = self.select(query, &sources).await?;

        let annotation = match selection {
            Selection::NoMatch => {
                debug!(%query, "oracle selected no source");
                return Err(TributaryError::NoData);
            }
            Selection::Single {
                source,
                query: sub_query,
            } => self.answer_single(query, source, &sub_query).await?,
            Selection::Joined {
                left,
                right,
                left_query,
                right_query,
                keys,
            } => {
                self.answer_joined(query, left, right, &left_query, &right_query, &keys)
                    .await?
            }
        };

        self.store.insert(annotation.clone());
        Ok(annotation)
    }

    /// Ask the oracle for a routing decision, under its time budget.
    async fn select(&self, query: &str, sources: &[SourceDescriptor]) -> Result<Selection> {
        match timeout(self.oracle_timeout, self.oracle.select(query, sources)).await {
            Err(_) | Ok(Err(OracleError::Timeout)) => {
                Err(TributaryError::Timeout(self.oracle_timeout.as_secs()))
            }
            Ok(Err(e)) => Err(TributaryError::Oracle(e)),
            Ok(Ok(selection)) => Ok(selection),
        }
    }

    /// Fetch from one source selected by combined index.
    async fn answer_single(
        &self,
        original_query: &str,
        index: usize,
        sub_query: &str,
    ) -> Result<Annotation> {
        let total = self.dataframe_retrievers.len() + self.text_retrievers.len();

        if let Some(retriever) = self.dataframe_retrievers.get(index) {
            debug!(source = %retriever.name(), %sub_query, "fetching tabular answer");
            let frame = self.fetch_frame(index, sub_query).await?;
            return match frame {
                Some(frame) if !frame.is_empty() => Ok(Annotation::new(
                    retriever.name(),
                    original_query,
                    Payload::Table(frame),
                )),
                _ => Err(TributaryError::NoData),
            };
        }

        if index < total {
            let retriever = &self.text_retrievers[index - self.dataframe_retrievers.len()];
            debug!(source = %retriever.name(), %sub_query, "fetching text answer");
            let answer = self.fetch_text(retriever, sub_query).await?;
            return match answer {
                Some(answer) if !answer.is_blank() => Ok(Annotation::new(
                    retriever.name(),
                    original_query,
                    Payload::Text(answer),
                )),
                _ => Err(TributaryError::NoData),
            };
        }

        Err(TributaryError::Oracle(OracleError::Selection(format!(
            "source index {} out of range ({} registered)",
            index, total
        ))))
    }

    /// Fetch from two join-compatible tabular sources and inner-join the
    /// results. The legs run sequentially; a failed leg degrades to "no
    /// data" or surfaces, per the configured policy.
    async fn answer_joined(
        &self,
        original_query: &str,
        left: usize,
        right: usize,
        left_query: &str,
        right_query: &str,
        keys: &JoinKeys,
    ) -> Result<Annotation> {
        self.validate_join_pair(left, right)?;

        let left_name = self.dataframe_retrievers[left].name().to_string();
        let right_name = self.dataframe_retrievers[right].name().to_string();
        debug!(
            left = %left_name,
            right = %right_name,
            left_key = %keys.left_key,
            right_key = %keys.right_key,
            "answering query across two sources"
        );

        let Some(left_frame) = self.fetch_join_leg(left, left_query).await? else {
            return Err(TributaryError::NoData);
        };
        let Some(right_frame) = self.fetch_join_leg(right, right_query).await? else {
            return Err(TributaryError::NoData);
        };

        let joined = match left_frame.inner_join(&right_frame, &keys.left_key, &keys.right_key) {
            Ok(joined) => joined,
            Err(e) => match self.join_failure_policy {
                JoinFailurePolicy::Degrade => {
                    warn!(error = %e, "join failed, degrading to no data");
                    return Err(TributaryError::NoData);
                }
                JoinFailurePolicy::Error => return Err(TributaryError::Frame(e)),
            },
        };

        if joined.is_empty() {
            debug!("join produced no overlapping rows");
            return Err(TributaryError::NoData);
        }

        get_metrics().joins_total.inc();
        Ok(Annotation::new(
            format!("{} + {}", left_name, right_name),
            original_query,
            Payload::Table(joined),
        ))
    }

    fn validate_join_pair(&self, left: usize, right: usize) -> Result<()> {
        let frames = self.dataframe_retrievers.len();
        if left >= frames || right >= frames {
            return Err(TributaryError::Oracle(OracleError::Selection(format!(
                "join pair ({}, {}) out of range ({} dataframe sources)",
                left, right, frames
            ))));
        }
        if left == right {
            return Err(TributaryError::Oracle(OracleError::Selection(
                "join pair names the same source twice".to_string(),
            )));
        }
        for index in [left, right] {
            if !self.dataframe_retrievers[index].join_compatible() {
                return Err(TributaryError::Oracle(OracleError::Selection(format!(
                    "source \"{}\" is not join-compatible",
                    self.dataframe_retrievers[index].name()
                ))));
            }
        }
        Ok(())
    }

    /// One leg of a join: like [`fetch_frame`], but a genuine retriever
    /// failure is handled per the join-failure policy. An empty result
    /// is normalized to `None`.
    async fn fetch_join_leg(&self, index: usize, query: &str) -> Result<Option<DataFrame>> {
        match self.fetch_frame(index, query).await {
            Ok(Some(frame)) if !frame.is_empty() => Ok(Some(frame)),
            Ok(_) => Ok(None),
            Err(TributaryError::Retriever(e)) => match self.join_failure_policy {
                JoinFailurePolicy::Degrade => {
                    warn!(
                        source = %self.dataframe_retrievers[index].name(),
                        error = %e,
                        "join leg failed, degrading to no data"
                    );
                    Ok(None)
                }
                JoinFailurePolicy::Error => Err(TributaryError::Retriever(e)),
            },
            Err(e) => Err(e),
        }
    }

    /// Fetch a table from a dataframe retriever under the per-fetch
    /// budget, re-classifying timeouts.
    async fn fetch_frame(&self, index: usize, query: &str) -> Result<Option<DataFrame>> {
        let retriever = &self.dataframe_retrievers[index];
        match timeout(self.fetch_timeout, retriever.fetch(query)).await {
            Err(_) | Ok(Err(RetrieverError::Timeout)) => {
                Err(TributaryError::Timeout(self.fetch_timeout.as_secs()))
            }
            Ok(Err(e)) => Err(TributaryError::Retriever(e)),
            Ok(Ok(frame)) => Ok(frame),
        }
    }

    async fn fetch_text(
        &self,
        retriever: &SharedTextRetriever,
        query: &str,
    ) -> Result<Option<TextAnswer>> {
        match timeout(self.fetch_timeout, retriever.fetch(query)).await {
            Err(_) | Ok(Err(RetrieverError::Timeout)) => {
                Err(TributaryError::Timeout(self.fetch_timeout.as_secs()))
            }
            Ok(Err(e)) => Err(TributaryError::Retriever(e)),
            Ok(Ok(answer)) => Ok(answer),
        }
    }
}
