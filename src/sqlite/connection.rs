//! Database connections.

use std::fmt;
use std::path::Path;
use std::rc::Rc;

use crate::dispatch::{Method, MethodSlot, Prototype, SlotVisitor};
use crate::sqlite::{module, Module, Statement};
use crate::types::Result;

/// An open SQLite database.
///
/// Not `Send`: a connection and the statements prepared on it stay on the
/// thread that opened it.
pub struct Connection {
    raw: Rc<rusqlite::Connection>,
    module: &'static Module,
}

impl Connection {
    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_raw(rusqlite::Connection::open(path)?))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_raw(rusqlite::Connection::open_in_memory()?))
    }

    /// Wrap an already opened `rusqlite` connection.
    pub fn from_raw(raw: rusqlite::Connection) -> Self {
        Self {
            raw: Rc::new(raw),
            module: module(),
        }
    }

    /// Execute one or more semicolon separated statements, discarding results.
    pub fn exec(&self, sql: &str) -> Result<()> {
        self.module.connection.exec.call(self, sql)
    }

    /// Compile `sql` into a reusable statement bound to that text.
    pub fn prepare(&self, sql: &str) -> Result<Statement> {
        self.module.connection.prepare.call(self, sql)
    }

    /// Underlying `rusqlite` connection.
    pub fn raw(&self) -> &rusqlite::Connection {
        &self.raw
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("path", &self.raw.path())
            .finish()
    }
}

/// Method table of [`Connection`].
#[derive(Debug)]
pub struct ConnectionPrototype {
    pub exec: MethodSlot<Connection, str, ()>,
    pub prepare: MethodSlot<Connection, str, Statement>,
}

impl ConnectionPrototype {
    pub(crate) fn new() -> Self {
        Self {
            exec: MethodSlot::new("exec", Method::new(exec)),
            prepare: MethodSlot::new("prepare", Method::new(prepare)),
        }
    }
}

impl Prototype for ConnectionPrototype {
    type Receiver = Connection;
    type Args = str;

    const NAME: &'static str = "Connection";
    const METHODS: &'static [&'static str] = &["exec", "prepare"];

    fn visit<V>(&self, method: &str, visitor: V) -> Option<V::Output>
    where
        V: SlotVisitor<Connection, str>,
    {
        match method {
            "exec" => Some(visitor.visit(&self.exec)),
            "prepare" => Some(visitor.visit(&self.prepare)),
            _ => None,
        }
    }
}

fn exec(conn: &Connection, sql: &str) -> Result<()> {
    conn.raw.execute_batch(sql)?;
    Ok(())
}

fn prepare(conn: &Connection, sql: &str) -> Result<Statement> {
    // Compiling surfaces syntax errors here rather than on first execution,
    // and leaves the compiled statement in the cache for the executions.
    conn.raw.prepare_cached(sql)?;
    Ok(Statement::new(Rc::clone(&conn.raw), sql, conn.module))
}
