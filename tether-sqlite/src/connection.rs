use crate::extract::{Bind, extract_value};
use rusqlite::{OpenFlags, ffi};
use std::time::Duration;
use tether_core::{
    Connection, Context, Error, NotConnectedError, Params, Result, Row, RowNames, RowSet,
    RowsAffected, truncate_long,
};

pub struct SqliteConnection {
    pub(crate) connection: Option<rusqlite::Connection>,
}

impl SqliteConnection {
    pub fn open(path: &str, flags: OpenFlags) -> Result<Self> {
        let connection = rusqlite::Connection::open_with_flags(path, flags)
            .with_context(|| format!("Could not open the database `{}`", path))?;
        connection.busy_timeout(Duration::from_secs(5))?;
        Ok(Self {
            connection: Some(connection),
        })
    }

    fn connection(&mut self) -> Result<&mut rusqlite::Connection> {
        self.connection.as_mut().ok_or_else(|| {
            Error::new(NotConnectedError {
                backend: "sqlite".into(),
                reason: "the connection was closed".into(),
            })
        })
    }

    /// Prepare the statement and bind every `:name` it references.
    fn prepare<'c>(
        connection: &'c rusqlite::Connection,
        sql: &str,
        params: &Params,
    ) -> Result<rusqlite::Statement<'c>> {
        let mut statement = connection.prepare(sql)?;
        let names = (1..=statement.parameter_count())
            .map(|i| statement.parameter_name(i).map(ToString::to_string))
            .collect::<Vec<_>>();
        for (i, name) in names.into_iter().enumerate() {
            let Some(name) = name else {
                return Err(Error::msg("Positional parameters are not supported"));
            };
            let key = name.trim_start_matches([':', '@', '$']);
            let Some(value) = params.get(key) else {
                return Err(Error::msg(format!("Parameter `{}` has no value", key)));
            };
            statement.raw_bind_parameter(i + 1, Bind(value))?;
        }
        Ok(statement)
    }

    fn fetch(&mut self, sql: &str, params: &Params) -> Result<RowSet> {
        let connection = self.connection()?;
        let mut statement = Self::prepare(connection, sql, params)?;
        let labels: RowNames = statement
            .column_names()
            .into_iter()
            .map(ToString::to_string)
            .collect();
        let count = labels.len();
        let mut rows = statement.raw_query();
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            result.push(
                (0..count)
                    .map(|i| extract_value(row.get_ref(i)?))
                    .collect::<Result<Row>>()?,
            );
        }
        Ok(RowSet {
            labels,
            rows: result,
        })
    }

    fn execute(&mut self, sql: &str, params: &Params) -> Result<RowsAffected> {
        let connection = self.connection()?;
        let mut statement = Self::prepare(connection, sql, params)?;
        let rows_affected = statement.raw_execute()? as u64;
        Ok(RowsAffected { rows_affected })
    }
}

impl Connection for SqliteConnection {
    fn query(&mut self, sql: &str, params: &Params) -> Result<Vec<Row>> {
        Ok(self.query_with_columns(sql, params)?.rows)
    }

    fn query_with_columns(&mut self, sql: &str, params: &Params) -> Result<RowSet> {
        self.fetch(sql, params)
            .with_context(|| format!("While executing the query:\n{}", truncate_long!(sql)))
            .inspect_err(|e| log::error!("{:#}", e))
    }

    fn command(&mut self, sql: &str, params: &Params) -> Result<RowsAffected> {
        self.execute(sql, params)
            .with_context(|| format!("While executing the command:\n{}", truncate_long!(sql)))
            .inspect_err(|e| log::error!("{:#}", e))
    }

    fn close(&mut self) {
        if let Some(connection) = self.connection.take()
            && let Err((_, e)) = connection.close()
        {
            log::warn!("Could not close the sqlite connection: {}", e);
        }
    }

    fn is_duplicate_key(&self, error: &Error) -> bool {
        match error.downcast_ref::<rusqlite::Error>() {
            Some(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.extended_code,
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            ),
            _ => error
                .chain()
                .any(|e| e.to_string().contains("UNIQUE constraint failed")),
        }
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        self.close();
    }
}
