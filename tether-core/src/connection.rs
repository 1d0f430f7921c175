use crate::{
    Dialect, Error, GenericDialect, NotConnectedError, Params, Result, Row, RowSet, RowsAffected,
};
use std::ops::{Deref, DerefMut};

/// One established session with a backend.
///
/// Implementations execute SQL produced by the backend [`Dialect`], with named parameters.
pub trait Connection {
    /// Run a statement returning positional rows.
    fn query(&mut self, sql: &str, params: &Params) -> Result<Vec<Row>>;

    /// Run a statement returning rows together with the column labels.
    fn query_with_columns(&mut self, sql: &str, params: &Params) -> Result<RowSet>;

    /// Run a write statement, committed before returning.
    fn command(&mut self, sql: &str, params: &Params) -> Result<RowsAffected>;

    /// Release the session. Calling it more than once does nothing.
    fn close(&mut self);

    /// Whether the error reports the violation of a unique constraint.
    fn is_duplicate_key(&self, error: &Error) -> bool;
}

/// Factory of connections for one backend, carrying its dialect.
pub trait Driver: Send + Sync {
    fn name(&self) -> &'static str;

    fn dialect(&self) -> &dyn Dialect;

    fn connect(&self) -> Result<Box<dyn Connection>>;
}

/// A connection acquired for a single operation, closed when dropped.
pub struct ConnectionGuard {
    connection: Box<dyn Connection>,
    backend: &'static str,
}

impl ConnectionGuard {
    /// Open a connection through the driver, a failure is reported as [`NotConnectedError`].
    pub fn acquire(driver: &dyn Driver) -> Result<Self> {
        match driver.connect() {
            Ok(connection) => {
                log::trace!("Connection to {} acquired", driver.name());
                Ok(Self {
                    connection,
                    backend: driver.name(),
                })
            }
            Err(e) => {
                let error = Error::new(NotConnectedError {
                    backend: driver.name().into(),
                    reason: format!("{:#}", e),
                });
                log::error!("{:#}", error);
                Err(error)
            }
        }
    }
}

impl Deref for ConnectionGuard {
    type Target = dyn Connection;
    fn deref(&self) -> &Self::Target {
        self.connection.as_ref()
    }
}

impl DerefMut for ConnectionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection.as_mut()
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.connection.close();
        log::trace!("Connection to {} released", self.backend);
    }
}

/// Driver of records that were not given a backend: every execution fails with [`NotConnectedError`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConnection;

impl NoConnection {
    fn error(&self) -> Error {
        Error::new(NotConnectedError {
            backend: "no backend".into(),
            reason: "no connection was configured".into(),
        })
    }
}

impl Driver for NoConnection {
    fn name(&self) -> &'static str {
        "none"
    }

    fn dialect(&self) -> &dyn Dialect {
        &GenericDialect
    }

    fn connect(&self) -> Result<Box<dyn Connection>> {
        Ok(Box::new(NoConnection))
    }
}

impl Connection for NoConnection {
    fn query(&mut self, _sql: &str, _params: &Params) -> Result<Vec<Row>> {
        Err(self.error())
    }

    fn query_with_columns(&mut self, _sql: &str, _params: &Params) -> Result<RowSet> {
        Err(self.error())
    }

    fn command(&mut self, _sql: &str, _params: &Params) -> Result<RowsAffected> {
        Err(self.error())
    }

    fn close(&mut self) {}

    fn is_duplicate_key(&self, _error: &Error) -> bool {
        false
    }
}
