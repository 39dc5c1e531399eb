//! Tests for the DataSystem routing pipeline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use tributary::{
    DataFrame, DataSystem, DataFrameRetriever, JoinKeys, Oracle, OracleError, Payload,
    RetrieverError, Selection, SourceDescriptor, TableRetriever, TributaryError,
};

/// Oracle that always returns the same routing decision.
struct ScriptedOracle {
    selection: Selection,
}

impl ScriptedOracle {
    fn new(selection: Selection) -> Arc<Self> {
        Arc::new(Self { selection })
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn select(
        &self,
        _query: &str,
        _sources: &[SourceDescriptor],
    ) -> Result<Selection, OracleError> {
        Ok(self.selection.clone())
    }
}

/// Frame retriever that counts fetch calls.
struct CountingRetriever {
    name: String,
    frame: DataFrame,
    calls: AtomicUsize,
}

#[async_trait]
impl DataFrameRetriever for CountingRetriever {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, _query: &str) -> Result<Option<DataFrame>, RetrieverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(self.frame.clone()))
    }
}

fn energy_atlas_frame() -> DataFrame {
    DataFrame::from_records(&[
        json!({"name": "Alpha Solar", "county": "Ross", "capacity_mw": 120}),
        json!({"name": "Beta Solar", "county": "Pike", "capacity_mw": 85}),
        json!({"name": "Gamma Solar", "county": "Athens", "capacity_mw": 40}),
    ])
    .unwrap()
}

#[tokio::test]
async fn test_single_source_scenario() {
    let oracle = ScriptedOracle::new(Selection::Single {
        source: 0,
        query: "solar plants".to_string(),
    });
    let mut system = DataSystem::new(oracle);
    system.add_dataframe_retriever(Arc::new(TableRetriever::new(
        "Energy Atlas",
        energy_atlas_frame(),
    )));

    let annotation = system
        .process_request("solar plants in Ohio")
        .await
        .unwrap();

    assert_eq!(annotation.source, "Energy Atlas");
    let Payload::Table(frame) = &annotation.payload else {
        panic!("expected a tabular payload");
    };
    assert_eq!(frame.num_rows(), 3);

    // Row order matches the retriever's native output order, re-indexed
    // densely from zero.
    let records = frame.to_records();
    assert_eq!(records[0]["name"], "Alpha Solar");
    assert_eq!(records[1]["name"], "Beta Solar");
    assert_eq!(records[2]["name"], "Gamma Solar");
}

#[tokio::test]
async fn test_two_source_join_scenario() {
    let oracle = ScriptedOracle::new(Selection::Joined {
        left: 0,
        right: 1,
        left_query: "rivers by county".to_string(),
        right_query: "population by county".to_string(),
        keys: JoinKeys {
            left_key: "county".to_string(),
            right_key: "county".to_string(),
        },
    });

    let wen_okn = DataFrame::from_records(&[
        json!({"county": "Ross", "river": "Scioto"}),
        json!({"county": "Athens", "river": "Hocking"}),
        json!({"county": "Defiance", "river": "Maumee"}),
    ])
    .unwrap();
    let data_commons = DataFrame::from_records(&[
        json!({"county": "Ross", "population": 76666}),
        json!({"county": "Athens", "population": 62431}),
        json!({"county": "Franklin", "population": 1323807}),
    ])
    .unwrap();

    let mut system = DataSystem::new(oracle);
    system.add_dataframe_retriever(Arc::new(
        TableRetriever::new("WEN-OKN", wen_okn).with_join_compatible(true),
    ));
    system.add_dataframe_retriever(Arc::new(
        TableRetriever::new("Data Commons", data_commons).with_join_compatible(true),
    ));

    let annotation = system
        .process_request("population near rivers in Ohio")
        .await
        .unwrap();

    assert_eq!(annotation.source, "WEN-OKN + Data Commons");
    let Payload::Table(frame) = &annotation.payload else {
        panic!("expected a tabular payload");
    };
    assert_eq!(frame.columns(), &["county", "river", "population"]);

    // Only counties present in both source tables survive; unmatched
    // rows are absent, never null-padded.
    let records = frame.to_records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["county"], "Ross");
    assert_eq!(records[0]["population"], 76666);
    assert_eq!(records[1]["county"], "Athens");
}

#[tokio::test]
async fn test_no_match_makes_no_fetch_calls() {
    let oracle = ScriptedOracle::new(Selection::NoMatch);
    let retriever = Arc::new(CountingRetriever {
        name: "Energy Atlas".to_string(),
        frame: energy_atlas_frame(),
        calls: AtomicUsize::new(0),
    });

    let mut system = DataSystem::new(oracle);
    system.add_dataframe_retriever(retriever.clone());

    let err = system.process_request("lunar geology").await.unwrap_err();
    assert!(matches!(err, TributaryError::NoData));
    assert_eq!(retriever.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_queries_rejected_before_routing() {
    let oracle = ScriptedOracle::new(Selection::Single {
        source: 0,
        query: "q".to_string(),
    });
    let retriever = Arc::new(CountingRetriever {
        name: "Energy Atlas".to_string(),
        frame: energy_atlas_frame(),
        calls: AtomicUsize::new(0),
    });
    let mut system = DataSystem::new(oracle);
    system.add_dataframe_retriever(retriever.clone());

    for query in ["", "   "] {
        let err = system.process_request(query).await.unwrap_err();
        assert!(matches!(err, TributaryError::EmptyQuery));
    }
    assert_eq!(retriever.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_duplicate_names_route_by_registry_index() {
    // Two sources share a name; the oracle's index decides which one
    // answers.
    let oracle = ScriptedOracle::new(Selection::Single {
        source: 1,
        query: "q".to_string(),
    });

    let first = DataFrame::from_records(&[json!({"origin": "first"})]).unwrap();
    let second = DataFrame::from_records(&[json!({"origin": "second"})]).unwrap();

    let mut system = DataSystem::new(oracle);
    system.add_dataframe_retriever(Arc::new(TableRetriever::new("Atlas", first)));
    system.add_dataframe_retriever(Arc::new(TableRetriever::new("Atlas", second)));

    let annotation = system.process_request("which atlas?").await.unwrap();
    let Payload::Table(frame) = &annotation.payload else {
        panic!("expected a tabular payload");
    };
    assert_eq!(frame.to_records()[0]["origin"], "second");
}

#[tokio::test]
async fn test_each_success_appends_one_annotation() {
    let oracle = ScriptedOracle::new(Selection::Single {
        source: 0,
        query: "q".to_string(),
    });
    let mut system = DataSystem::new(oracle);
    system.add_dataframe_retriever(Arc::new(TableRetriever::new(
        "Energy Atlas",
        energy_atlas_frame(),
    )));

    system.process_request("first query").await.unwrap();
    system.process_request("second query").await.unwrap();

    let snapshot = system.store().snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].query, "first query");
    assert_eq!(snapshot[1].query, "second query");
}
