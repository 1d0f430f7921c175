use crate::{
    Comparison, Condition, ConnectionGuard, Driver, Error, FilterKey, Operator, OrderTerm, Params,
    Record, Result, Row, RowLabeled, Schema, Select, Statement, Value, bind_param,
};
use std::{mem, sync::Arc};

/// How [`Query::get`] materializes rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Validated [`Record`]s, snapshot included.
    #[default]
    Records,
    /// Rows labeled with their column names.
    Maps,
    /// Positional rows.
    Rows,
}

/// Rows produced by the last execution of a [`Query`].
#[derive(Debug, Clone)]
pub enum ResultSet {
    Records(Vec<Record>),
    Maps(Vec<RowLabeled>),
    Rows(Vec<Row>),
}

impl Default for ResultSet {
    fn default() -> Self {
        ResultSet::Records(Vec::new())
    }
}

impl ResultSet {
    pub fn mode(&self) -> Mode {
        match self {
            ResultSet::Records(..) => Mode::Records,
            ResultSet::Maps(..) => Mode::Maps,
            ResultSet::Rows(..) => Mode::Rows,
        }
    }
    pub fn len(&self) -> usize {
        match self {
            ResultSet::Records(v) => v.len(),
            ResultSet::Maps(v) => v.len(),
            ResultSet::Rows(v) => v.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// The records, empty in the other modes.
    pub fn records(&self) -> &[Record] {
        match self {
            ResultSet::Records(v) => v,
            _ => &[],
        }
    }
    /// The labeled rows, empty in the other modes.
    pub fn maps(&self) -> &[RowLabeled] {
        match self {
            ResultSet::Maps(v) => v,
            _ => &[],
        }
    }
    /// The positional rows, empty in the other modes.
    pub fn rows(&self) -> &[Row] {
        match self {
            ResultSet::Rows(v) => v,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone)]
struct Projection {
    columns: Vec<String>,
    distinct: bool,
}

/// Builder of SELECT statements over one record type, holding the last resultset.
///
/// Projection and ordering apply to the next [`Query::get`] only.
#[derive(Clone)]
pub struct Query {
    schema: Arc<Schema>,
    driver: Arc<dyn Driver>,
    projection: Option<Projection>,
    order: Vec<String>,
    result: ResultSet,
}

impl Query {
    /// Query over the type of `prototype`, through the same driver.
    pub fn new(prototype: &Record) -> Self {
        Self::of(prototype.schema().clone(), prototype.driver().clone())
    }

    pub fn of(schema: Arc<Schema>, driver: Arc<dyn Driver>) -> Self {
        Self {
            schema,
            driver,
            projection: None,
            order: Vec::new(),
            result: ResultSet::default(),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Restrict the next execution to these columns, rows are then returned labeled.
    ///
    /// Entries are attribute names, column names or `(expression) alias`.
    pub fn select<I, S>(&mut self, columns: I, distinct: bool) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(Projection {
            columns: columns.into_iter().map(Into::into).collect(),
            distinct,
        });
        self
    }

    /// Sort the next execution, `-name` for descending.
    pub fn order<I, S>(&mut self, terms: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order = terms.into_iter().map(Into::into).collect();
        self
    }

    fn column_of<'a>(&'a self, name: &'a str) -> &'a str {
        self.schema
            .position(name)
            .map(|i| self.schema.fields()[i].column_name())
            .unwrap_or(name)
    }

    fn condition(&self, params: &mut Params, key: &str, value: Value) -> Result<Condition> {
        let FilterKey {
            attribute,
            operator,
        } = FilterKey::parse(key);
        let Some(i) = self.schema.resolve(attribute) else {
            return Err(Error::msg(format!(
                "Cannot filter `{}` on `{}`, it is not one of its attributes",
                self.schema.table_name(),
                attribute
            )));
        };
        let column = self.schema.fields()[i].column_name().to_string();
        let value = value.to_storage();
        let comparison = match (operator, value) {
            (Operator::Eq, Value::Null) => Comparison::IsNull,
            (Operator::Not, Value::Null) => Comparison::IsNotNull,
            (operator, Value::List(values)) if operator.is_list() => Comparison::List(
                operator,
                values
                    .into_iter()
                    .enumerate()
                    .map(|(n, v)| bind_param(params, &format!("{}_{}", key, n), v))
                    .collect(),
            ),
            (_, value @ Value::List(..)) => {
                return Err(Error::msg(format!(
                    "Filter `{}` cannot compare with the list {}",
                    key, value
                )));
            }
            (operator, value) if operator.is_list() => {
                Comparison::List(operator, vec![bind_param(params, key, value)])
            }
            (operator, value) => Comparison::Binary(operator, bind_param(params, key, value)),
        };
        Ok(Condition { column, comparison })
    }

    /// Build the SELECT for the filters without executing it, nor consuming projection and ordering.
    pub fn statement<I, K, V>(&self, mode: Mode, filters: I) -> Result<Statement>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        if mode == Mode::Records
            && self.projection.is_none()
            && self.schema.primary_key().is_none()
        {
            return Err(Error::msg(format!(
                "`{}` has no primary key, query it as maps or rows",
                self.schema.table_name()
            )));
        }
        let mut params = Params::new();
        let conditions: Vec<Condition> = filters
            .into_iter()
            .map(|(k, v)| self.condition(&mut params, k.as_ref(), v.into()))
            .collect::<Result<_>>()?;
        let (columns, distinct): (Vec<String>, bool) = match &self.projection {
            Some(projection) => {
                if projection.columns.is_empty() {
                    return Err(Error::msg(format!(
                        "The projection on `{}` is empty",
                        self.schema.table_name()
                    )));
                }
                (
                    projection
                        .columns
                        .iter()
                        .map(|v| self.column_of(v).to_string())
                        .collect(),
                    projection.distinct,
                )
            }
            None => (self.schema.columns().map(Into::into).collect(), false),
        };
        let order: Vec<OrderTerm> = self
            .order
            .iter()
            .filter(|v| !v.is_empty() && v.as_str() != "-")
            .map(|v| {
                let term = OrderTerm::parse(v);
                OrderTerm {
                    column: self.column_of(&term.column).to_string(),
                    ..term
                }
            })
            .collect();
        let select = Select {
            table: self.schema.table_name().into(),
            columns,
            distinct,
            conditions,
            order,
        };
        let mut sql = String::new();
        self.driver.dialect().write_select(&mut sql, &select);
        Ok(Statement { sql, params })
    }

    /// Execute with AND-ed filters (`age__gte`, `name__like`, bare keys for equality) and
    /// replace the resultset. A projection forces [`Mode::Maps`].
    pub fn get<I, K, V>(&mut self, mode: Mode, filters: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mode = if self.projection.is_some() {
            Mode::Maps
        } else {
            mode
        };
        let statement = self.statement(mode, filters);
        self.projection = None;
        self.order.clear();
        let statement = statement?;
        log::debug!("Querying `{}`:\n{}", self.schema.table_name(), statement);
        let mut connection = ConnectionGuard::acquire(self.driver.as_ref())?;
        self.result = match mode {
            Mode::Rows => ResultSet::Rows(connection.query(&statement.sql, &statement.params)?),
            Mode::Maps => ResultSet::Maps(
                connection
                    .query_with_columns(&statement.sql, &statement.params)?
                    .labeled()
                    .collect(),
            ),
            Mode::Records => {
                let rows = connection.query_with_columns(&statement.sql, &statement.params)?;
                drop(connection);
                let records: Vec<Record> = rows
                    .labeled()
                    .map(|row| {
                        let mut record = Record::new(self.schema.clone(), self.driver.clone());
                        record.load_data(&row)?;
                        Ok(record)
                    })
                    .collect::<Result<_>>()?;
                ResultSet::Records(records)
            }
        };
        Ok(self)
    }

    /// Execute without filters.
    pub fn all(&mut self, mode: Mode) -> Result<&mut Self> {
        self.get(mode, Vec::<(&str, Value)>::new())
    }

    pub fn result(&self) -> &ResultSet {
        &self.result
    }
    pub fn into_result(self) -> ResultSet {
        self.result
    }
    pub fn len(&self) -> usize {
        self.result.len()
    }
    pub fn is_empty(&self) -> bool {
        self.result.is_empty()
    }
    pub fn records(&self) -> &[Record] {
        self.result.records()
    }
    pub fn maps(&self) -> &[RowLabeled] {
        self.result.maps()
    }
    pub fn rows(&self) -> &[Row] {
        self.result.rows()
    }

    /// Entries of the current resultset whose attributes equal all the given values, without
    /// touching storage.
    pub fn only<I, K, V>(&self, restrictions: I) -> Result<ResultSet>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let restrictions: Vec<(String, Value)> = restrictions
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.into()))
            .collect();
        Ok(match &self.result {
            ResultSet::Records(records) => {
                let restrictions = restrictions
                    .into_iter()
                    .map(|(k, v)| {
                        let Some(i) = self.schema.position(&k) else {
                            return Err(Error::msg(format!(
                                "`{}` has no attribute `{}`",
                                self.schema.table_name(),
                                k
                            )));
                        };
                        // Null matches null, never the default
                        let value = if v.is_null() {
                            v
                        } else {
                            self.schema.fields()[i].normalize(v)?
                        };
                        Ok((i, value))
                    })
                    .collect::<Result<Vec<_>>>()?;
                ResultSet::Records(
                    records
                        .iter()
                        .filter(|r| {
                            restrictions
                                .iter()
                                .all(|(i, v)| r.fields()[*i].get() == v)
                        })
                        .cloned()
                        .collect(),
                )
            }
            ResultSet::Maps(rows) => {
                let restrictions: Vec<_> = restrictions
                    .iter()
                    .map(|(k, v)| (self.column_of(k), v.to_storage()))
                    .collect();
                ResultSet::Maps(
                    rows.iter()
                        .filter(|r| {
                            restrictions
                                .iter()
                                .all(|(k, v)| r.get_column(k) == Some(v))
                        })
                        .cloned()
                        .collect(),
                )
            }
            ResultSet::Rows(rows) => {
                if !restrictions.is_empty() {
                    return Err(Error::msg(
                        "Positional rows have no names to restrict on, query them as maps",
                    ));
                }
                ResultSet::Rows(rows.clone())
            }
        })
    }

    /// Delete the row of every record in the resultset, identified by its snapshot, and clear
    /// the resultset. Returns the number of DELETE commands issued.
    ///
    /// On failure the records not yet deleted stay in the resultset.
    pub fn delete_all(&mut self) -> Result<u64> {
        let records = match &mut self.result {
            ResultSet::Records(records) => records,
            other => {
                let error = Error::msg(format!(
                    "Only records can be deleted, the resultset of `{}` holds {:?}",
                    self.schema.table_name(),
                    other.mode()
                ));
                log::error!("{:#}", error);
                return Err(error);
            }
        };
        let statements = records
            .iter()
            .map(Record::delete_statement)
            .collect::<Result<Vec<_>>>()?;
        if statements.is_empty() {
            return Ok(0);
        }
        let mut connection = ConnectionGuard::acquire(self.driver.as_ref())?;
        let mut remaining = mem::take(records).into_iter();
        let mut count = 0;
        for statement in statements {
            log::debug!("Deleting from `{}`:\n{}", self.schema.table_name(), statement);
            match connection.command(&statement.sql, &statement.params) {
                Ok(affected) => {
                    if affected.rows_affected != 1 {
                        log::warn!(
                            "Deleting a record of `{}` affected {} rows, expected 1",
                            self.schema.table_name(),
                            affected.rows_affected
                        );
                    }
                    remaining.next();
                    count += 1;
                }
                Err(e) => {
                    self.result = ResultSet::Records(remaining.collect());
                    return Err(e);
                }
            }
        }
        Ok(count)
    }
}
