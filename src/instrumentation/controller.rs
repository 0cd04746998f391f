//! Enable/disable control surface of the SQLite instrumentation.

use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use opentelemetry::trace::{Tracer, TracerProvider};
use opentelemetry::{InstrumentationScope, KeyValue};
use tracing::{debug, warn};

use crate::dispatch::{Method, Prototype};
use crate::instrumentation::config::InstrumentationConfig;
use crate::instrumentation::interceptor::{Decorator, Interceptor};
use crate::otel::{query_text_attribute, run_traced, system_attribute, TracerHandle};
use crate::sqlite::{
    self, Connection, ConnectionPrototype, LoadHookId, Module, Params, Statement,
    StatementPrototype,
};
use crate::types::InstrumentationError;

type AttributesFn<R, A> = dyn Fn(&R, &A) -> Vec<KeyValue> + Send + Sync;

/// Wraps a method so every call runs inside a CLIENT span named after it.
struct TracingDecorator<R: ?Sized, A: ?Sized> {
    tracer: Arc<TracerHandle>,
    attributes: Arc<AttributesFn<R, A>>,
}

impl<R: ?Sized + 'static, A: ?Sized + 'static> TracingDecorator<R, A> {
    fn new<F>(tracer: &Arc<TracerHandle>, attributes: F) -> Self
    where
        F: Fn(&R, &A) -> Vec<KeyValue> + Send + Sync + 'static,
    {
        Self {
            tracer: Arc::clone(tracer),
            attributes: Arc::new(attributes),
        }
    }
}

impl<R: ?Sized + 'static, A: ?Sized + 'static> Decorator<R, A> for TracingDecorator<R, A> {
    fn decorate<O: 'static>(
        &self,
        method: &'static str,
        original: Arc<Method<R, A, O>>,
    ) -> Method<R, A, O> {
        let tracer = Arc::clone(&self.tracer);
        let attributes = Arc::clone(&self.attributes);
        Method::new(move |receiver: &R, args: &A| {
            let span = tracer.start_client_span(method, attributes(receiver, args));
            run_traced(span, || original.invoke(receiver, args))
        })
    }
}

#[derive(Debug, Default)]
struct State {
    enabled: bool,
    /// This instance installed the wrappers currently in the patch record.
    patched: bool,
    load_hook: Option<LoadHookId>,
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// The method tables are process-wide, so the record of what is wrapped is too.
// Lock order: an instance's `State` first, then `PATCHES`.
static PATCHES: LazyLock<Mutex<Interceptor>> = LazyLock::new(Mutex::default);

fn patches() -> MutexGuard<'static, Interceptor> {
    PATCHES.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Traces `Connection::{exec, prepare}` and `Statement::{all, get, run}`.
///
/// Starts disabled; `new` enables it unless the config says otherwise.
/// Enabling patches the client module if it is already loaded, otherwise on
/// its first load. Dropping the instrumentation disables it.
///
/// The method tables and their patch record are process-wide. One instance
/// at a time owns the installed wrappers: enabling another instance while
/// they are installed fails with [`InstrumentationError::AlreadyWrapped`]
/// and leaves that instance disabled. Once the owner is disabled or dropped,
/// the methods are back to their originals and another instance may enable.
///
/// # Example
///
/// ```rust,ignore
/// let instrumentation = SqliteInstrumentation::new(InstrumentationConfig::disabled())?;
/// instrumentation.set_tracer_provider(&provider);
/// instrumentation.enable()?;
///
/// let db = Connection::open_in_memory()?;
/// db.exec("CREATE TABLE test (id NUMBER NOT NULL, data TEXT)")?; // span "exec"
/// ```
#[derive(Debug)]
pub struct SqliteInstrumentation {
    config: InstrumentationConfig,
    tracer: Arc<TracerHandle>,
    state: Arc<Mutex<State>>,
}

impl SqliteInstrumentation {
    /// Instrumentation scope name reported on every span.
    pub const NAME: &'static str = env!("CARGO_PKG_NAME");
    /// Instrumentation scope version reported on every span.
    pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    pub fn new(config: InstrumentationConfig) -> Result<Self, InstrumentationError> {
        let scope = InstrumentationScope::builder(Self::NAME)
            .with_version(Self::VERSION)
            .build();
        let instrumentation = Self {
            config,
            tracer: Arc::new(TracerHandle::new(scope)),
            state: Arc::new(Mutex::new(State::default())),
        };

        if instrumentation.config.enabled {
            instrumentation.enable()?;
        }
        Ok(instrumentation)
    }

    pub fn config(&self) -> &InstrumentationConfig {
        &self.config
    }

    /// Start spans from `provider` from now on. May be called at any time.
    pub fn set_tracer_provider<P>(&self, provider: &P)
    where
        P: TracerProvider,
        P::Tracer: Send + Sync + 'static,
        <P::Tracer as Tracer>::Span: Send + Sync + 'static,
    {
        self.tracer.set_provider(provider);
    }

    pub fn is_enabled(&self) -> bool {
        lock(&self.state).enabled
    }

    /// Whether wrappers are currently installed on the loaded module.
    pub fn is_patched(&self) -> bool {
        lock(&self.state).patched
    }

    /// Install the tracing wrappers. Calling it again while enabled does nothing.
    pub fn enable(&self) -> Result<(), InstrumentationError> {
        let mut state = lock(&self.state);
        if state.enabled {
            return Ok(());
        }
        state.enabled = true;

        if state.load_hook.is_none() {
            state.load_hook = Some(self.register_load_hook());
        }
        if let Some(module) = sqlite::loaded_module() {
            if let Err(err) = patch(&mut state, module, &self.tracer) {
                abandon(&mut state);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Restore the original methods. Calling it again while disabled does nothing.
    pub fn disable(&self) -> Result<(), InstrumentationError> {
        let mut state = lock(&self.state);
        if !state.enabled {
            return Ok(());
        }
        state.enabled = false;

        if let Some(hook) = state.load_hook.take() {
            sqlite::remove_load_hook(hook);
        }
        if let Some(module) = sqlite::loaded_module() {
            unpatch(&mut state, module)?;
        }
        Ok(())
    }

    fn register_load_hook(&self) -> LoadHookId {
        let state = Arc::downgrade(&self.state);
        let tracer = Arc::clone(&self.tracer);
        sqlite::on_load(Arc::new(move |module: &'static Module| {
            let Some(state) = state.upgrade() else {
                return;
            };
            let mut state = lock(&state);
            if !state.enabled {
                return;
            }
            debug!("sqlite module loaded, patching");
            if let Err(err) = patch(&mut state, module, &tracer) {
                warn!(error = %err, "failed to patch sqlite module on load");
                abandon(&mut state);
            }
        }))
    }
}

impl Drop for SqliteInstrumentation {
    fn drop(&mut self) {
        if let Err(err) = self.disable() {
            warn!(error = %err, "failed to disable sqlite instrumentation");
        }
    }
}

/// Back out of an `enable` that could not install its wrappers.
fn abandon(state: &mut State) {
    state.enabled = false;
    if let Some(hook) = state.load_hook.take() {
        sqlite::remove_load_hook(hook);
    }
}

fn patch(
    state: &mut State,
    module: &'static Module,
    tracer: &Arc<TracerHandle>,
) -> Result<(), InstrumentationError> {
    // A module loaded again (or loaded while enabling) is already patched.
    if state.patched {
        return Ok(());
    }

    let mut patches = patches();
    if let Some(key) = patches.wrapped().next() {
        return Err(InstrumentationError::AlreadyWrapped {
            target: key.target,
            method: key.method.to_owned(),
        });
    }

    // All or nothing: a partial patch would survive every later unpatch.
    if let Err(err) = wrap_all(&mut patches, module, tracer) {
        unwrap_all(&mut patches, module)?;
        return Err(err);
    }

    state.patched = true;
    debug!(methods = patches.len(), "patched sqlite module");
    Ok(())
}

fn unpatch(state: &mut State, module: &'static Module) -> Result<(), InstrumentationError> {
    if !state.patched {
        return Ok(());
    }

    unwrap_all(&mut patches(), module)?;
    state.patched = false;
    debug!("unpatched sqlite module");
    Ok(())
}

fn wrap_all(
    patches: &mut Interceptor,
    module: &'static Module,
    tracer: &Arc<TracerHandle>,
) -> Result<(), InstrumentationError> {
    let exec = TracingDecorator::new(tracer, |_: &Connection, _: &str| vec![system_attribute()]);
    patches.wrap(&module.connection, "exec", &exec)?;

    let prepare = TracingDecorator::new(tracer, |_: &Connection, sql: &str| {
        vec![system_attribute(), query_text_attribute(sql)]
    });
    patches.wrap(&module.connection, "prepare", &prepare)?;

    // Statement executions report the statement's own SQL, never their arguments.
    let execute = TracingDecorator::new(tracer, |stmt: &Statement, _: &Params| {
        vec![system_attribute(), query_text_attribute(stmt.source_sql())]
    });
    patches.wrap_many(&module.statement, StatementPrototype::METHODS, &execute)
}

fn unwrap_all(patches: &mut Interceptor, module: &'static Module) -> Result<(), InstrumentationError> {
    patches.unwrap_many(&module.connection, ConnectionPrototype::METHODS)?;
    patches.unwrap_many(&module.statement, StatementPrototype::METHODS)
}
