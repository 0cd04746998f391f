//! Enabling the instrumentation never changes what the client returns.

mod common;

use common::Harness;
use proptest::prelude::*;
use serde_json::json;
use sqlite_otel::{Connection, Row, RunResult};

#[derive(Debug, PartialEq)]
struct Outcome {
    runs: Vec<Result<RunResult, String>>,
    all: Result<Vec<Row>, String>,
    get: Result<Option<Row>, String>,
}

fn exercise(records: &[(Option<i64>, String)]) -> Outcome {
    let db = Connection::open_in_memory().unwrap();
    db.exec("CREATE TABLE test (id NUMBER NOT NULL, data TEXT)")
        .unwrap();

    let insert = db
        .prepare("INSERT INTO test (id, data) VALUES (:id, :data)")
        .unwrap();
    let runs = records
        .iter()
        .map(|(id, data)| {
            insert
                .run(json!({ "id": id, "data": data }))
                .map_err(|err| err.to_string())
        })
        .collect();

    let select = db.prepare("SELECT id, data FROM test ORDER BY rowid").unwrap();
    Outcome {
        runs,
        all: select.all(()).map_err(|err| err.to_string()),
        get: select.get(()).map_err(|err| err.to_string()),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_results_unchanged_by_instrumentation(
        records in prop::collection::vec((prop::option::of(any::<i64>()), "[a-z ]{0,12}"), 0..8)
    ) {
        let harness = Harness::disabled();
        let untraced = exercise(&records);

        harness.instrumentation.enable().unwrap();
        let traced = exercise(&records);
        harness.instrumentation.disable().unwrap();

        prop_assert_eq!(&untraced, &traced);

        // exec + 2 prepares + one run per record + all + get
        prop_assert_eq!(harness.spans().len(), records.len() + 5);

        let failed = traced.runs.iter().filter(|run| run.is_err()).count();
        let error_spans = harness
            .spans()
            .iter()
            .filter(|span| matches!(span.status, opentelemetry::trace::Status::Error { .. }))
            .count();
        prop_assert_eq!(error_spans, failed);
    }
}
