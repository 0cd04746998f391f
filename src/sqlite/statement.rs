//! Prepared statements.

use std::fmt;
use std::rc::Rc;

use rusqlite::types::ValueRef;
use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::dispatch::{Method, MethodSlot, Prototype, SlotVisitor};
use crate::sqlite::{Module, Params};
use crate::types::Result;

/// One result row keyed by column name.
pub type Row = Map<String, Value>;

/// Outcome of [`Statement::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunResult {
    /// Rows changed by the statement
    pub changes: u64,
    /// Rowid of the most recent successful insert on the connection
    pub last_insert_rowid: i64,
}

/// A single SQL statement bound to its source text.
pub struct Statement {
    raw: Rc<rusqlite::Connection>,
    source: String,
    module: &'static Module,
}

impl Statement {
    pub(crate) fn new(raw: Rc<rusqlite::Connection>, source: &str, module: &'static Module) -> Self {
        Self {
            raw,
            source: source.to_owned(),
            module,
        }
    }

    /// SQL text the statement was prepared from.
    pub fn source_sql(&self) -> &str {
        &self.source
    }

    /// Execute and collect every result row.
    pub fn all(&self, params: impl Into<Params>) -> Result<Vec<Row>> {
        self.module.statement.all.call(self, &params.into())
    }

    /// Execute and return the first result row, if any.
    pub fn get(&self, params: impl Into<Params>) -> Result<Option<Row>> {
        self.module.statement.get.call(self, &params.into())
    }

    /// Execute to completion and report the changes made.
    pub fn run(&self, params: impl Into<Params>) -> Result<RunResult> {
        self.module.statement.run.call(self, &params.into())
    }

    // Cached per connection; bindings are cleared when the statement returns to the cache.
    fn compile(&self, params: &Params) -> Result<rusqlite::CachedStatement<'_>> {
        let mut stmt = self.raw.prepare_cached(&self.source)?;
        params.bind(&mut stmt)?;
        Ok(stmt)
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Method table of [`Statement`].
#[derive(Debug)]
pub struct StatementPrototype {
    pub all: MethodSlot<Statement, Params, Vec<Row>>,
    pub get: MethodSlot<Statement, Params, Option<Row>>,
    pub run: MethodSlot<Statement, Params, RunResult>,
}

impl StatementPrototype {
    pub(crate) fn new() -> Self {
        Self {
            all: MethodSlot::new("all", Method::new(all)),
            get: MethodSlot::new("get", Method::new(get)),
            run: MethodSlot::new("run", Method::new(run)),
        }
    }
}

impl Prototype for StatementPrototype {
    type Receiver = Statement;
    type Args = Params;

    const NAME: &'static str = "Statement";
    const METHODS: &'static [&'static str] = &["all", "get", "run"];

    fn visit<V>(&self, method: &str, visitor: V) -> Option<V::Output>
    where
        V: SlotVisitor<Statement, Params>,
    {
        match method {
            "all" => Some(visitor.visit(&self.all)),
            "get" => Some(visitor.visit(&self.get)),
            "run" => Some(visitor.visit(&self.run)),
            _ => None,
        }
    }
}

fn all(stmt: &Statement, params: &Params) -> Result<Vec<Row>> {
    let mut compiled = stmt.compile(params)?;
    let columns = column_names(&compiled);

    let mut rows = compiled.raw_query();
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(to_row(row, &columns)?);
    }
    Ok(out)
}

fn get(stmt: &Statement, params: &Params) -> Result<Option<Row>> {
    let mut compiled = stmt.compile(params)?;
    let columns = column_names(&compiled);

    let mut rows = compiled.raw_query();
    let first = match rows.next()? {
        Some(row) => Some(to_row(row, &columns)?),
        None => None,
    };
    Ok(first)
}

fn run(stmt: &Statement, params: &Params) -> Result<RunResult> {
    let mut compiled = stmt.compile(params)?;

    // Step through any RETURNING rows so the statement runs to completion.
    let mut rows = compiled.raw_query();
    while rows.next()?.is_some() {}

    Ok(RunResult {
        changes: stmt.raw.changes() as u64,
        last_insert_rowid: stmt.raw.last_insert_rowid(),
    })
}

fn column_names(stmt: &rusqlite::Statement<'_>) -> Vec<String> {
    stmt.column_names().into_iter().map(String::from).collect()
}

fn to_row(row: &rusqlite::Row<'_>, columns: &[String]) -> Result<Row> {
    let mut out = Map::with_capacity(columns.len());
    for (index, column) in columns.iter().enumerate() {
        out.insert(column.clone(), to_json(row.get_ref(index)?));
    }
    Ok(out)
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(int) => Value::from(int),
        ValueRef::Real(real) => Number::from_f64(real).map_or(Value::Null, Value::Number),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(blob) => Value::Array(blob.iter().map(|byte| Value::from(*byte)).collect()),
    }
}
