//! In memory driver recording every statement it receives and answering with scripted results.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tether::{
    Connection, Dialect, Driver, Error, GenericDialect, Params, Result, Row, RowSet, RowsAffected,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Query,
    QueryWithColumns,
    Command,
}

/// One statement received by a [`MockDriver`] connection.
#[derive(Debug, Clone)]
pub struct Execution {
    pub kind: Kind,
    pub sql: String,
    pub params: Params,
}

/// Scripted answer to the next statement.
#[derive(Debug, Clone)]
pub enum Response {
    Rows(RowSet),
    Affected(u64),
    Fail(String),
    /// Fail with a [`UniqueViolation`].
    Duplicate(String),
}

#[derive(Debug, thiserror::Error)]
#[error("duplicate key value violates unique constraint: {0}")]
pub struct UniqueViolation(pub String);

#[derive(Default)]
struct State {
    executions: Vec<Execution>,
    responses: VecDeque<Response>,
    refuse: Option<String>,
    opened: usize,
    closed: usize,
}

/// Without scripted responses queries return no rows and commands affect one row.
#[derive(Clone)]
pub struct MockDriver {
    dialect: Arc<dyn Dialect>,
    state: Arc<Mutex<State>>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new(GenericDialect)
    }
}

impl MockDriver {
    pub fn new(dialect: impl Dialect + 'static) -> Self {
        Self {
            dialect: Arc::new(dialect),
            state: Default::default(),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue the answer for the next statement.
    pub fn respond(&self, response: Response) -> &Self {
        self.state().responses.push_back(response);
        self
    }

    /// Make every following connection attempt fail.
    pub fn refuse_connections(&self, reason: impl Into<String>) {
        self.state().refuse = Some(reason.into());
    }

    pub fn executions(&self) -> Vec<Execution> {
        self.state().executions.clone()
    }

    pub fn clear(&self) {
        let mut state = self.state();
        state.executions.clear();
        state.responses.clear();
    }

    /// Number of connections opened and closed so far.
    pub fn connections(&self) -> (usize, usize) {
        let state = self.state();
        (state.opened, state.closed)
    }
}

impl Driver for MockDriver {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    fn connect(&self) -> Result<Box<dyn Connection>> {
        let mut state = self.state();
        if let Some(reason) = &state.refuse {
            return Err(Error::msg(reason.clone()));
        }
        state.opened += 1;
        Ok(Box::new(MockConnection {
            state: self.state.clone(),
            open: true,
        }))
    }
}

pub struct MockConnection {
    state: Arc<Mutex<State>>,
    open: bool,
}

impl MockConnection {
    fn execute(&mut self, kind: Kind, sql: &str, params: &Params) -> Result<Option<Response>> {
        if !self.open {
            return Err(Error::msg("The connection is closed"));
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.executions.push(Execution {
            kind,
            sql: sql.into(),
            params: params.clone(),
        });
        match state.responses.pop_front() {
            Some(Response::Fail(message)) => Err(Error::msg(message)),
            Some(Response::Duplicate(message)) => Err(Error::new(UniqueViolation(message))),
            response => Ok(response),
        }
    }
}

impl Connection for MockConnection {
    fn query(&mut self, sql: &str, params: &Params) -> Result<Vec<Row>> {
        match self.execute(Kind::Query, sql, params)? {
            Some(Response::Rows(rows)) => Ok(rows.rows),
            Some(other) => Err(Error::msg(format!(
                "Scripted {:?} does not answer a query",
                other
            ))),
            None => Ok(Vec::new()),
        }
    }

    fn query_with_columns(&mut self, sql: &str, params: &Params) -> Result<RowSet> {
        match self.execute(Kind::QueryWithColumns, sql, params)? {
            Some(Response::Rows(rows)) => Ok(rows),
            Some(other) => Err(Error::msg(format!(
                "Scripted {:?} does not answer a query",
                other
            ))),
            None => Ok(RowSet::default()),
        }
    }

    fn command(&mut self, sql: &str, params: &Params) -> Result<RowsAffected> {
        match self.execute(Kind::Command, sql, params)? {
            Some(Response::Affected(rows_affected)) => Ok(RowsAffected { rows_affected }),
            Some(other) => Err(Error::msg(format!(
                "Scripted {:?} does not answer a command",
                other
            ))),
            None => Ok(RowsAffected { rows_affected: 1 }),
        }
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .closed += 1;
        }
    }

    fn is_duplicate_key(&self, error: &Error) -> bool {
        error.downcast_ref::<UniqueViolation>().is_some()
    }
}
