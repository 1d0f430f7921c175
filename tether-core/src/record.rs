use crate::{
    Condition, ConnectionGuard, Context, Delete, Dialect, Driver, DuplicateKeyError, Error, Field,
    Insert, Mode, NoConnection, NotSavedReason, ObjectNotSavedError, Params, Query, Result,
    RowLabeled, Schema, Select, Statement, Update, Value, bind_param,
};
use indexmap::IndexMap;
use std::{
    borrow::Cow,
    fmt::{self, Debug, Display},
    sync::Arc,
};

/// An entity made of [`Field`]s, persisted as one row of the schema table.
///
/// The snapshot holds the raw column values as last read from (or written to) storage, it
/// identifies the row in UPDATE and DELETE statements.
#[derive(Clone)]
pub struct Record {
    schema: Arc<Schema>,
    driver: Arc<dyn Driver>,
    fields: Vec<Field>,
    snapshot: IndexMap<String, Value>,
    is_new: bool,
}

impl Record {
    pub fn new(schema: Arc<Schema>, driver: Arc<dyn Driver>) -> Self {
        let fields = schema.fields().iter().cloned().map(Field::prepared).collect();
        Self {
            schema,
            driver,
            fields,
            snapshot: IndexMap::new(),
            is_new: true,
        }
    }

    /// Record without a backend, any persistence fails with [`crate::NotConnectedError`].
    pub fn detached(schema: Arc<Schema>) -> Self {
        Self::new(schema, Arc::new(NoConnection))
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }
    pub fn dialect(&self) -> &dyn Dialect {
        self.driver.dialect()
    }
    pub fn table_name(&self) -> &str {
        self.schema.table_name()
    }
    pub fn is_new(&self) -> bool {
        self.is_new
    }
    /// Raw values by column, as last read from or written to storage.
    pub fn snapshot(&self) -> &IndexMap<String, Value> {
        &self.snapshot
    }
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
    pub fn field(&self, attribute: &str) -> Option<&Field> {
        self.schema.position(attribute).map(|i| &self.fields[i])
    }
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.field(attribute).map(Field::get)
    }
    pub fn display(&self, attribute: &str) -> Option<Cow<'_, Value>> {
        self.field(attribute).map(Field::display)
    }
    /// The record loaded for a reference attribute.
    pub fn referenced(&self, attribute: &str) -> Option<&Record> {
        self.field(attribute).and_then(Field::referenced)
    }
    pub fn primary_key(&self) -> Option<&Value> {
        self.schema
            .primary_key_position()
            .map(|i| self.fields[i].get())
    }

    fn index(&self, attribute: &str) -> Result<usize> {
        self.schema.position(attribute).ok_or_else(|| {
            Error::msg(format!(
                "`{}` has no attribute `{}`",
                self.schema.table_name(),
                attribute
            ))
        })
    }

    /// Assign an attribute. A raw key assigned to a reference attribute loads the referenced row.
    pub fn set(&mut self, attribute: &str, value: impl Into<Value>) -> Result<()> {
        let i = self.index(attribute)?;
        let driver = self.driver.clone();
        self.fields[i].resolve(value, |schema, key| lookup(schema, &driver, key))
    }

    /// Assign a date, time or timestamp attribute from text in the given format.
    pub fn set_formatted(&mut self, attribute: &str, text: &str, pattern: &str) -> Result<()> {
        let i = self.index(attribute)?;
        Ok(self.fields[i].set_formatted(text, pattern)?)
    }

    pub fn set_record(&mut self, attribute: &str, record: Record) -> Result<()> {
        let i = self.index(attribute)?;
        Ok(self.fields[i].set_record(record)?)
    }

    /// Storage values by column name.
    pub fn values(&self, with_primary_key: bool) -> IndexMap<String, Value> {
        self.fields
            .iter()
            .filter(|v| with_primary_key || !v.def().is_primary_key())
            .map(|v| (v.def().column_name().to_string(), v.storage_value()))
            .collect()
    }

    fn identifying_conditions(&self, params: &mut Params) -> Vec<Condition> {
        self.snapshot
            .iter()
            .map(|(column, value)| {
                Condition::equal(params, column, &format!("old__{}", column), value.clone())
            })
            .collect()
    }

    /// SELECT of every column for the row with the given key.
    pub fn select_statement(&self, key: impl Into<Value>) -> Result<Statement> {
        let Some(primary_key) = self.schema.primary_key() else {
            return Err(Error::msg(format!(
                "`{}` has no primary key, it cannot be loaded by key",
                self.schema.table_name()
            )));
        };
        let mut params = Params::new();
        let column = primary_key.column_name();
        let condition = Condition::equal(&mut params, column, column, key.into().to_storage());
        let select = Select {
            table: self.schema.table_name().into(),
            columns: self.schema.columns().map(Into::into).collect(),
            conditions: vec![condition],
            ..Default::default()
        };
        let mut sql = String::new();
        self.dialect().write_select(&mut sql, &select);
        Ok(Statement { sql, params })
    }

    /// INSERT of the current values, the key is included only when it was assigned.
    pub fn insert_statement(&self) -> Statement {
        let mut params = Params::new();
        let values = self
            .fields
            .iter()
            .filter(|v| !(v.def().is_primary_key() && v.is_null()))
            .map(|v| {
                let column = v.def().column_name();
                let param = bind_param(&mut params, column, v.storage_value());
                (column.to_string(), param)
            })
            .collect();
        let insert = Insert {
            table: self.schema.table_name().into(),
            values,
        };
        let mut sql = String::new();
        self.dialect().write_insert(&mut sql, &insert);
        Statement { sql, params }
    }

    /// UPDATE of every non key column, identified by the snapshot.
    ///
    /// The statement is empty when there is nothing besides the key to write.
    pub fn update_statement(&self) -> Result<Statement> {
        if self.snapshot.is_empty() {
            let error = Error::new(ObjectNotSavedError {
                table: self.schema.table_name().into(),
                reason: NotSavedReason::MissingSnapshot,
            });
            log::error!("{:#}", error);
            return Err(error);
        }
        let mut params = Params::new();
        let assignments: Vec<_> = self
            .fields
            .iter()
            .filter(|v| !v.def().is_primary_key())
            .map(|v| {
                let column = v.def().column_name();
                let param = bind_param(&mut params, column, v.storage_value());
                (column.to_string(), param)
            })
            .collect();
        if assignments.is_empty() {
            return Ok(Statement::default());
        }
        let update = Update {
            table: self.schema.table_name().into(),
            assignments,
            conditions: self.identifying_conditions(&mut params),
        };
        let mut sql = String::new();
        self.dialect().write_update(&mut sql, &update);
        Ok(Statement { sql, params })
    }

    /// INSERT when the record is new, UPDATE otherwise.
    pub fn save_statement(&self) -> Result<Statement> {
        if self.is_new {
            Ok(self.insert_statement())
        } else {
            self.update_statement()
        }
    }

    /// DELETE of the row identified by the snapshot.
    pub fn delete_statement(&self) -> Result<Statement> {
        if self.snapshot.is_empty() {
            let error = Error::msg(format!(
                "Cannot delete a record of `{}` that was never loaded or saved",
                self.schema.table_name()
            ));
            log::error!("{:#}", error);
            return Err(error);
        }
        let mut params = Params::new();
        let delete = Delete {
            table: self.schema.table_name().into(),
            conditions: self.identifying_conditions(&mut params),
        };
        let mut sql = String::new();
        self.dialect().write_delete(&mut sql, &delete);
        Ok(Statement { sql, params })
    }

    /// Load the row with the given key. Returns false, leaving the record untouched, when no row
    /// matches.
    pub fn load(&mut self, key: impl Into<Value>) -> Result<bool> {
        let statement = self.select_statement(key)?;
        log::debug!("Loading `{}`:\n{}", self.schema.table_name(), statement);
        let rows = {
            let mut connection = ConnectionGuard::acquire(self.driver.as_ref())?;
            connection.query_with_columns(&statement.sql, &statement.params)?
        };
        match rows.labeled().next() {
            Some(row) => {
                self.load_data(&row)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Populate from a row labeled with column names and take its values as the snapshot.
    ///
    /// Nothing changes if any value is rejected.
    pub fn load_data(&mut self, row: &RowLabeled) -> Result<()> {
        let mut fields = self.fields.clone();
        let mut snapshot = IndexMap::with_capacity(row.labels.len());
        for (label, value) in row.iter() {
            let Some(i) = self.schema.position_by_column(label) else {
                let error = Error::msg(format!(
                    "Column `{}` does not belong to `{}`",
                    label,
                    self.schema.table_name()
                ));
                log::error!("{:#}", error);
                return Err(error);
            };
            let driver = self.driver.clone();
            fields[i]
                .resolve(value.clone(), |schema, key| lookup(schema, &driver, key))
                .with_context(|| {
                    format!(
                        "While loading column `{}` of `{}`",
                        label,
                        self.schema.table_name()
                    )
                })?;
            snapshot.insert(
                self.schema.fields()[i].column_name().to_string(),
                value.clone(),
            );
        }
        self.fields = fields;
        self.snapshot = snapshot;
        self.is_new = false;
        if let Some(hooks) = self.schema.hooks().cloned() {
            hooks.on_load(self);
        }
        Ok(())
    }

    /// Write the record: INSERT when new, UPDATE of the snapshot row otherwise.
    pub fn save(&mut self) -> Result<()> {
        let schema = self.schema.clone();
        let table = schema.table_name();
        let statement = self.save_statement()?;
        let inserting = self.is_new;
        let missing_key = schema
            .primary_key_position()
            .filter(|i| inserting && self.fields[*i].is_null());
        let mut key = None;
        if !statement.sql.is_empty() {
            log::debug!("Saving `{}`:\n{}", table, statement);
            let mut connection = ConnectionGuard::acquire(self.driver.as_ref())?;
            let affected = match connection.command(&statement.sql, &statement.params) {
                Ok(affected) => affected,
                Err(e) if connection.is_duplicate_key(&e) => {
                    let error = Error::new(DuplicateKeyError {
                        table: table.into(),
                        message: format!("{:#}", e),
                    })
                    .context(ObjectNotSavedError {
                        table: table.into(),
                        reason: NotSavedReason::DuplicateKey,
                    });
                    log::error!("{:#}", error);
                    return Err(error);
                }
                Err(e) => return Err(e),
            };
            if affected.rows_affected != 1 {
                log::warn!(
                    "Saving a record of `{}` affected {} rows, expected 1",
                    table,
                    affected.rows_affected
                );
            }
            if let Some(i) = missing_key {
                let mut sql = String::new();
                let column = schema.fields()[i].column_name();
                if self
                    .dialect()
                    .write_inserted_key_query(&mut sql, table, column)
                {
                    match connection.query(&sql, &Params::new()) {
                        Ok(rows) => {
                            key = rows
                                .into_iter()
                                .next()
                                .and_then(|row| row.into_vec().into_iter().next())
                        }
                        Err(e) => log::warn!(
                            "Could not read the key of the new record of `{}`: {:#}",
                            table,
                            e
                        ),
                    }
                }
            }
        }
        // The row is written, failing to learn its key does not fail the save
        if let Some(i) = missing_key {
            if key.as_ref().is_none_or(Value::is_null) {
                key = self.recover_key().unwrap_or_else(|e| {
                    log::warn!("{:#}", e);
                    None
                });
            }
            match key {
                Some(key) if !key.is_null() => {
                    if let Err(e) = self.fields[i].set(key) {
                        log::warn!(
                            "Could not assign the key of the new record of `{}`: {}",
                            table,
                            e
                        );
                    }
                }
                _ => log::warn!("Could not recover the key of the new record of `{}`", table),
            }
        }
        let previous_key = schema
            .primary_key()
            .filter(|_| !inserting)
            .and_then(|v| self.snapshot.get(v.column_name()).cloned());
        let mut snapshot = self.values(true);
        if let (Some(pk), Some(previous)) = (schema.primary_key(), previous_key) {
            snapshot.insert(pk.column_name().into(), previous);
        }
        self.snapshot = snapshot;
        self.is_new = false;
        if let Some(hooks) = schema.hooks().cloned() {
            hooks.on_save(self);
        }
        Ok(())
    }

    /// Find the key of the just inserted row through its other values, the highest key wins
    /// when several rows share them.
    fn recover_key(&self) -> Result<Option<Value>> {
        let Some(primary_key) = self.schema.primary_key() else {
            return Ok(None);
        };
        let filters: Vec<_> = self
            .fields
            .iter()
            .filter(|v| !v.def().is_primary_key())
            .map(|v| (v.name().to_string(), v.get().clone()))
            .collect();
        let mut query = Query::of(self.schema.clone(), self.driver.clone());
        query
            .select([primary_key.name()], false)
            .order([format!("-{}", primary_key.name())]);
        query.get(Mode::Maps, filters)?;
        Ok(query
            .result()
            .maps()
            .first()
            .and_then(|row| row.get_column(primary_key.column_name()).cloned()))
    }
}

fn lookup(schema: &Arc<Schema>, driver: &Arc<dyn Driver>, key: &Value) -> Result<Option<Record>> {
    let mut record = Record::new(schema.clone(), driver.clone());
    Ok(if record.load(key.clone())? {
        Some(record)
    } else {
        None
    })
}

impl Display for Record {
    /// `Person: id=1, name=Ann, age=30, ...` with at most three attributes, key first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const SHOWN: usize = 3;
        write!(f, "{}:", self.schema.table_name())?;
        let key = self.schema.primary_key_position();
        let ordered = key
            .into_iter()
            .chain((0..self.fields.len()).filter(|i| Some(*i) != key));
        for (n, i) in ordered.enumerate() {
            if n == SHOWN {
                return f.write_str(", ...");
            }
            let field = &self.fields[i];
            write!(
                f,
                "{}{}={}",
                if n == 0 { " " } else { ", " },
                field.name(),
                field.display()
            )?;
        }
        Ok(())
    }
}

impl Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("table", &self.schema.table_name())
            .field("driver", &self.driver.name())
            .field("is_new", &self.is_new)
            .field("fields", &self.fields)
            .field("snapshot", &self.snapshot)
            .finish()
    }
}
