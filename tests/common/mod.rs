//! Shared test pipeline for instrumentation tests.

#![allow(dead_code)]

use std::sync::{Mutex, MutexGuard, PoisonError};

use opentelemetry::trace::Status;
use opentelemetry_sdk::trace::{
    InMemorySpanExporter, InMemorySpanExporterBuilder, SdkTracerProvider, SimpleSpanProcessor,
    SpanData,
};
use sqlite_otel::{InstrumentationConfig, SqliteInstrumentation};
use tracing_subscriber::EnvFilter;

// The client's method tables are process-wide.
static SERIAL: Mutex<()> = Mutex::new(());

pub fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn setup_test_pipeline() -> (SdkTracerProvider, InMemorySpanExporter) {
    let memory_exporter = InMemorySpanExporterBuilder::new().build();
    let processor = SimpleSpanProcessor::new(memory_exporter.clone());
    let provider = SdkTracerProvider::builder()
        .with_span_processor(processor)
        .build();

    (provider, memory_exporter)
}

pub fn find_attribute(span: &SpanData, key: &str) -> Option<String> {
    span.attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| kv.value.as_str().into_owned())
}

pub fn error_description(span: &SpanData) -> String {
    match &span.status {
        Status::Error { description } => description.to_string(),
        other => panic!("expected error status on span {}, got {other:?}", span.name),
    }
}

/// Enabled instrumentation exporting into memory, holding the serial lock.
pub struct Harness {
    pub instrumentation: SqliteInstrumentation,
    pub provider: SdkTracerProvider,
    pub exporter: InMemorySpanExporter,
    _serial: MutexGuard<'static, ()>,
}

impl Harness {
    pub fn enabled() -> Self {
        let harness = Self::disabled();
        harness.instrumentation.enable().unwrap();
        harness
    }

    pub fn disabled() -> Self {
        let serial = serial();
        init_logging();

        let (provider, exporter) = setup_test_pipeline();
        let instrumentation =
            SqliteInstrumentation::new(InstrumentationConfig::disabled()).unwrap();
        instrumentation.set_tracer_provider(&provider);

        Self {
            instrumentation,
            provider,
            exporter,
            _serial: serial,
        }
    }

    pub fn spans(&self) -> Vec<SpanData> {
        self.provider.force_flush().unwrap();
        self.exporter.get_finished_spans().unwrap()
    }

    pub fn reset(&self) {
        self.exporter.reset();
    }
}
