//! Enabling before the client module is loaded patches it on first load.
//!
//! Kept in its own test binary so nothing loads the module beforehand.

mod common;

use common::setup_test_pipeline;
use sqlite_otel::sqlite::{loaded_module, module};
use sqlite_otel::{Connection, InstrumentationConfig, SqliteInstrumentation};

#[test]
fn test_patch_on_first_load() {
    common::init_logging();
    assert!(loaded_module().is_none());

    let (provider, exporter) = setup_test_pipeline();
    let instrumentation = SqliteInstrumentation::new(InstrumentationConfig::disabled()).unwrap();
    instrumentation.set_tracer_provider(&provider);
    instrumentation.enable().unwrap();
    assert!(instrumentation.is_enabled());
    assert!(!instrumentation.is_patched());

    // Registered after the first, so its load hook finds the methods wrapped.
    let (late_provider, late_exporter) = setup_test_pipeline();
    let late = SqliteInstrumentation::new(InstrumentationConfig::disabled()).unwrap();
    late.set_tracer_provider(&late_provider);
    late.enable().unwrap();

    let db = Connection::open_in_memory().unwrap();
    assert!(loaded_module().is_some());
    assert!(instrumentation.is_patched());
    assert!(!late.is_patched());
    assert!(!late.is_enabled());

    // Loading again must not wrap a second time.
    module();
    db.exec("CREATE TABLE test (id NUMBER NOT NULL, data TEXT)")
        .unwrap();

    provider.force_flush().unwrap();
    let spans = exporter.get_finished_spans().unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].name, "exec");

    late_provider.force_flush().unwrap();
    assert!(late_exporter.get_finished_spans().unwrap().is_empty());

    instrumentation.disable().unwrap();
    late.disable().unwrap();
    assert!(!instrumentation.is_patched());

    exporter.reset();
    db.exec("CREATE TABLE IF NOT EXISTS noop (id INTEGER)").unwrap();
    provider.force_flush().unwrap();
    late_provider.force_flush().unwrap();
    assert!(exporter.get_finished_spans().unwrap().is_empty());
    assert!(late_exporter.get_finished_spans().unwrap().is_empty());
}
