use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use std::str;
use tether_core::{Context, Result, Value};

pub(crate) fn extract_value(value: ValueRef<'_>) -> Result<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Int64(v),
        ValueRef::Real(v) => Value::Float64(v),
        ValueRef::Text(v) => Value::Varchar(
            str::from_utf8(v)
                .context("A text column holds invalid UTF-8")?
                .into(),
        ),
        ValueRef::Blob(v) => Value::Blob(v.into()),
    })
}

/// Binds a value in its SQLite storage class: temporal and decimal values as text, booleans as
/// `Y`/`N` codes.
pub(crate) struct Bind<'a>(pub &'a Value);

impl ToSql for Bind<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Boolean(v) => ToSqlOutput::Borrowed(ValueRef::Text(if *v { b"Y" } else { b"N" })),
            Value::Int64(v) => ToSqlOutput::Borrowed(ValueRef::Integer(*v)),
            Value::Float64(v) => ToSqlOutput::Borrowed(ValueRef::Real(*v)),
            Value::Varchar(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            Value::Blob(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v)),
            Value::Decimal(..) | Value::Date(..) | Value::Time(..) | Value::Timestamp(..) => {
                ToSqlOutput::from(self.0.to_string())
            }
            Value::List(..) => {
                return Err(rusqlite::Error::ToSqlConversionFailure(
                    format!("A list cannot be bound as one parameter: {}", self.0).into(),
                ));
            }
        })
    }
}
