use crate::{rewrite_placeholders, value_holder::ValueHolder};
use postgres::{Client, error::SqlState, types::ToSql};
use tether_core::{
    Connection, Context, Error, NotConnectedError, Params, Result, Row, RowNames, RowSet,
    RowsAffected, truncate_long,
};

pub struct PostgresConnection {
    pub(crate) client: Option<Client>,
}

impl PostgresConnection {
    pub fn new(client: Client) -> Self {
        Self {
            client: Some(client),
        }
    }

    fn client(&mut self) -> Result<&mut Client> {
        self.client.as_mut().ok_or_else(|| {
            Error::new(NotConnectedError {
                backend: "postgres".into(),
                reason: "the connection was closed".into(),
            })
        })
    }

    fn fetch(&mut self, sql: &str, params: &Params) -> Result<RowSet> {
        let (sql, values) = rewrite_placeholders(sql, params)?;
        let holders: Vec<ValueHolder> = values.into_iter().cloned().map(ValueHolder).collect();
        let client = self.client()?;
        let statement = client.prepare(&sql)?;
        let labels: RowNames = statement
            .columns()
            .iter()
            .map(|v| v.name().to_string())
            .collect();
        let rows = client.query(&statement, &as_params(&holders))?;
        let rows: Vec<Row> = rows
            .iter()
            .map(|row| {
                (0..row.len())
                    .map(|i| Ok(row.try_get::<_, ValueHolder>(i)?.0))
                    .collect::<Result<Row>>()
            })
            .collect::<Result<_>>()?;
        Ok(RowSet { labels, rows })
    }

    fn execute(&mut self, sql: &str, params: &Params) -> Result<RowsAffected> {
        let (sql, values) = rewrite_placeholders(sql, params)?;
        let holders: Vec<ValueHolder> = values.into_iter().cloned().map(ValueHolder).collect();
        let rows_affected = self
            .client()?
            .execute(sql.as_str(), &as_params(&holders))?;
        Ok(RowsAffected { rows_affected })
    }
}

fn as_params(holders: &[ValueHolder]) -> Vec<&(dyn ToSql + Sync)> {
    holders.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

impl Connection for PostgresConnection {
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
        if let Some(client) = self.client.take()
            && let Err(e) = client.close()
        {
            log::warn!("Could not close the postgres connection: {}", e);
        }
    }

    fn is_duplicate_key(&self, error: &Error) -> bool {
        match error.downcast_ref::<postgres::Error>() {
            Some(e) => e.code() == Some(&SqlState::UNIQUE_VIOLATION),
            None => error
                .chain()
                .any(|e| e.to_string().contains("violates unique constraint")),
        }
    }
}

impl Drop for PostgresConnection {
    fn drop(&mut self) {
        self.close();
    }
}
