use crate::{Driver, Query, Record, Result, Schema, Value};
use std::sync::Arc;

/// Typed wrapper over a [`Record`].
///
/// ```ignore
/// struct Person(Record);
///
/// impl Model for Person {
///     fn schema() -> Arc<Schema> {
///         static SCHEMA: LazyLock<Arc<Schema>> = LazyLock::new(|| {
///             Schema::builder_for::<Person>()
///                 .field(FieldDef::int("id").primary_key())
///                 .field(FieldDef::text("name"))
///                 .build()
///                 .expect("valid schema")
///         });
///         SCHEMA.clone()
///     }
///     fn from_record(record: Record) -> Self {
///         Person(record)
///     }
///     fn record(&self) -> &Record {
///         &self.0
///     }
///     fn record_mut(&mut self) -> &mut Record {
///         &mut self.0
///     }
/// }
/// ```
pub trait Model: Sized {
    fn schema() -> Arc<Schema>;

    fn from_record(record: Record) -> Self;

    fn record(&self) -> &Record;

    fn record_mut(&mut self) -> &mut Record;

    /// New unsaved instance persisted through `driver`.
    fn create(driver: Arc<dyn Driver>) -> Self {
        Self::from_record(Record::new(Self::schema(), driver))
    }

    /// Instance loaded by key, `None` when no row matches.
    fn find(driver: Arc<dyn Driver>, key: impl Into<Value>) -> Result<Option<Self>> {
        let mut record = Record::new(Self::schema(), driver);
        Ok(if record.load(key)? {
            Some(Self::from_record(record))
        } else {
            None
        })
    }

    fn query(driver: Arc<dyn Driver>) -> Query {
        Query::of(Self::schema(), driver)
    }

    /// Wrap every record of the query resultset.
    fn from_query(query: &Query) -> Vec<Self> {
        query
            .records()
            .iter()
            .cloned()
            .map(Self::from_record)
            .collect()
    }

    fn save(&mut self) -> Result<()> {
        self.record_mut().save()
    }

    fn is_new(&self) -> bool {
        self.record().is_new()
    }
}
