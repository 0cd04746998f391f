//! Synchronous SQLite client.
//!
//! A thin layer over `rusqlite` exposing the surface the instrumentation
//! targets: `Connection::exec`, `Connection::prepare`, and
//! `Statement::{all, get, run}`. Each of those dispatches through the method
//! tables of the process-wide [`Module`].
//!
//! # Module loading
//!
//! The method tables are built the first time the module is loaded, which
//! happens when the first connection is opened (or [`module`] is called).
//! Load hooks registered before that moment fire exactly once, right after
//! the tables exist. A second load is a no-op and fires nothing.
//!
//! ```rust,ignore
//! use sqlite_otel::sqlite::Connection;
//! use serde_json::json;
//!
//! let db = Connection::open_in_memory()?;
//! db.exec("CREATE TABLE test (id NUMBER NOT NULL, data TEXT)")?;
//! let insert = db.prepare("INSERT INTO test (id, data) VALUES (:id, :data)")?;
//! insert.run(json!({ "id": 1, "data": "one" }))?;
//! ```

pub mod connection;
pub mod params;
pub mod statement;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use tracing::debug;

pub use connection::{Connection, ConnectionPrototype};
pub use params::Params;
pub use statement::{Row, RunResult, Statement, StatementPrototype};

/// Callback fired when the module is loaded for the first time.
pub type LoadHook = Arc<dyn Fn(&'static Module) + Send + Sync>;

/// Handle for removing a registered load hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadHookId(u64);

/// The exported types of the client: one method table per type.
#[derive(Debug)]
pub struct Module {
    pub connection: ConnectionPrototype,
    pub statement: StatementPrototype,
}

impl Module {
    fn new() -> Self {
        Self {
            connection: ConnectionPrototype::new(),
            statement: StatementPrototype::new(),
        }
    }
}

static MODULE: OnceLock<Module> = OnceLock::new();
static LOAD_HOOKS: Mutex<Vec<(LoadHookId, LoadHook)>> = Mutex::new(Vec::new());
static NEXT_HOOK_ID: AtomicU64 = AtomicU64::new(1);

fn load_hooks() -> MutexGuard<'static, Vec<(LoadHookId, LoadHook)>> {
    LOAD_HOOKS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Load the module, firing load hooks if this is the first load in the process.
pub fn module() -> &'static Module {
    if let Some(module) = MODULE.get() {
        return module;
    }

    let mut first_load = false;
    let module = MODULE.get_or_init(|| {
        first_load = true;
        Module::new()
    });

    if first_load {
        // Snapshot so hooks may register or remove hooks themselves.
        let hooks: Vec<LoadHook> = load_hooks().iter().map(|(_, hook)| Arc::clone(hook)).collect();
        debug!(hooks = hooks.len(), "sqlite module loaded");
        for hook in hooks {
            hook(module);
        }
    }

    module
}

/// The module if it has already been loaded.
pub fn loaded_module() -> Option<&'static Module> {
    MODULE.get()
}

/// Register a hook for the first load of the module.
///
/// Hooks registered after the load never fire; check [`loaded_module`] too.
pub fn on_load(hook: LoadHook) -> LoadHookId {
    let id = LoadHookId(NEXT_HOOK_ID.fetch_add(1, Ordering::Relaxed));
    load_hooks().push((id, hook));
    id
}

/// Remove a load hook. Unknown ids are ignored.
pub fn remove_load_hook(id: LoadHookId) {
    load_hooks().retain(|(registered, _)| *registered != id);
}
