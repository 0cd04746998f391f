//! Tracer used to start database spans.
//!
//! Until a provider is set, spans come from the global tracer provider,
//! looked up when each span starts. A provider can be set (and replaced) at
//! any time; the next span uses it.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use opentelemetry::global;
use opentelemetry::trace::{SpanBuilder, SpanKind, Tracer, TracerProvider};
use opentelemetry::{InstrumentationScope, KeyValue};

use crate::otel::span::DbSpan;

trait ErasedTracer: Send + Sync {
    fn start(&self, builder: SpanBuilder) -> DbSpan;
}

impl<T> ErasedTracer for T
where
    T: Tracer + Send + Sync,
    T::Span: Send + Sync + 'static,
{
    fn start(&self, builder: SpanBuilder) -> DbSpan {
        DbSpan::new(builder.start(self))
    }
}

struct ProvidedTracer(Box<dyn ErasedTracer>);

/// Process-wide tracer of the instrumentation.
pub struct TracerHandle {
    scope: InstrumentationScope,
    provided: ArcSwapOption<ProvidedTracer>,
}

impl TracerHandle {
    pub fn new(scope: InstrumentationScope) -> Self {
        Self {
            scope,
            provided: ArcSwapOption::empty(),
        }
    }

    /// Use `provider` for every span started from now on.
    pub fn set_provider<P>(&self, provider: &P)
    where
        P: TracerProvider,
        P::Tracer: Send + Sync + 'static,
        <P::Tracer as Tracer>::Span: Send + Sync + 'static,
    {
        let tracer = provider.tracer_with_scope(self.scope.clone());
        self.provided
            .store(Some(Arc::new(ProvidedTracer(Box::new(tracer)))));
    }

    /// Whether a provider has been set.
    pub fn has_provider(&self) -> bool {
        self.provided.load().is_some()
    }

    /// Instrumentation scope attached to every span.
    pub fn scope(&self) -> &InstrumentationScope {
        &self.scope
    }

    /// Start a CLIENT span named `name`.
    pub fn start_client_span(&self, name: &'static str, attributes: Vec<KeyValue>) -> DbSpan {
        let builder = SpanBuilder::from_name(name)
            .with_kind(SpanKind::Client)
            .with_attributes(attributes);

        let provided = self.provided.load();
        match &*provided {
            Some(tracer) => tracer.0.start(builder),
            None => {
                let tracer = global::tracer_provider().tracer_with_scope(self.scope.clone());
                DbSpan::new(builder.start(&tracer))
            }
        }
    }
}

impl fmt::Debug for TracerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracerHandle")
            .field("scope", &self.scope)
            .field("has_provider", &self.has_provider())
            .finish()
    }
}
