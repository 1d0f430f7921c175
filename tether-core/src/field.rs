use crate::{
    Record, Result, Schema, ValidationError, ValidationReason, Value, parse_date, parse_time,
    parse_timestamp,
};
use rust_decimal::Decimal;
use std::{
    borrow::Cow,
    fmt::{self, Debug},
    sync::Arc,
};
use time::{Date, PrimitiveDateTime, Time, format_description::parse_borrowed};

/// Presentation of a stored value, see [`Field::display`].
pub type Formatter = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Semantic type of a field.
#[derive(Debug, Clone)]
pub enum FieldType {
    Boolean,
    Bytes,
    Text { max_length: usize, accept_empty: bool },
    Date,
    DateTime,
    Decimal,
    Int,
    Time,
    /// Key of a row in another table, the referenced record is loaded with it.
    Reference(Arc<Schema>),
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Boolean => "boolean",
            FieldType::Bytes => "bytes",
            FieldType::Text { .. } => "text",
            FieldType::Date => "date",
            FieldType::DateTime => "timestamp",
            FieldType::Decimal => "decimal",
            FieldType::Int => "integer",
            FieldType::Time => "time",
            FieldType::Reference(..) => "reference",
        }
    }
}

/// Declaration of one attribute of a record type.
#[derive(Clone)]
pub struct FieldDef {
    pub(crate) name: String,
    pub(crate) column: Option<String>,
    pub(crate) field_type: FieldType,
    pub(crate) nullable: bool,
    pub(crate) default: Option<Value>,
    pub(crate) choices: Option<Vec<Value>>,
    pub(crate) display: Option<Formatter>,
    pub(crate) primary_key: bool,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            column: None,
            field_type,
            nullable: false,
            default: None,
            choices: None,
            display: None,
            primary_key: false,
        }
    }
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean)
    }
    pub fn bytes(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Bytes)
    }
    /// Text of at most 255 characters, not empty.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldType::Text {
                max_length: 255,
                accept_empty: false,
            },
        )
    }
    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Date)
    }
    pub fn datetime(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::DateTime)
    }
    pub fn decimal(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Decimal)
    }
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Int)
    }
    pub fn time(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Time)
    }
    pub fn reference(name: impl Into<String>, target: Arc<Schema>) -> Self {
        Self::new(name, FieldType::Reference(target))
    }

    /// Store under a column name different from the attribute name.
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
    /// Initial value, also substituted when null is assigned to a non nullable field.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
    pub fn choices<T: Into<Value>>(mut self, choices: impl IntoIterator<Item = T>) -> Self {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }
    pub fn display(mut self, formatter: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        self.display = Some(Arc::new(formatter));
        self
    }
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }
    /// Text fields only.
    pub fn max_length(mut self, value: usize) -> Self {
        if let FieldType::Text { max_length, .. } = &mut self.field_type {
            *max_length = value;
        }
        self
    }
    /// Text fields only.
    pub fn accept_empty(mut self) -> Self {
        if let FieldType::Text { accept_empty, .. } = &mut self.field_type {
            *accept_empty = true;
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn column_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }
    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }
    pub fn choice_values(&self) -> Option<&[Value]> {
        self.choices.as_deref()
    }
    pub fn reference_target(&self) -> Option<&Arc<Schema>> {
        match &self.field_type {
            FieldType::Reference(target) => Some(target),
            _ => None,
        }
    }

    pub(crate) fn error(&self, value: &Value, reason: ValidationReason) -> ValidationError {
        ValidationError {
            field: self.name.clone(),
            value: value.to_string(),
            reason,
        }
    }

    /// Validate and normalize a value for this field.
    ///
    /// Null is replaced by the default of non nullable fields, validated like any other value.
    /// Non null values of a reference field are returned untouched, the lookup happens in
    /// [`Field::resolve`].
    pub fn normalize(&self, value: Value) -> std::result::Result<Value, ValidationError> {
        if value.is_null() {
            if self.nullable {
                return Ok(Value::Null);
            }
            return match &self.default {
                Some(default) if !default.is_null() => self.validate(default.clone()),
                _ => Err(self.error(&value, ValidationReason::Null)),
            };
        }
        self.validate(value)
    }

    /// Conversion to the field type followed by the choices check, for non null values.
    fn validate(&self, value: Value) -> std::result::Result<Value, ValidationError> {
        let normalized = self.convert(value)?;
        if let Some(choices) = &self.choices
            && !choices.contains(&normalized)
        {
            return Err(self.error(&normalized, ValidationReason::NotInChoices));
        }
        Ok(normalized)
    }

    fn convert(&self, value: Value) -> std::result::Result<Value, ValidationError> {
        let wrong_type = |value: &Value| {
            self.error(
                value,
                ValidationReason::WrongType {
                    expected: self.field_type.name(),
                    found: value.type_name(),
                },
            )
        };
        let malformed = |value: &Value, e: &dyn fmt::Display| {
            self.error(value, ValidationReason::Malformed(e.to_string()))
        };
        Ok(match (&self.field_type, value) {
            (FieldType::Boolean, v @ Value::Boolean(..)) => v,
            (FieldType::Boolean, Value::Varchar(v)) if v == "Y" => Value::Boolean(true),
            (FieldType::Boolean, Value::Varchar(v)) if v == "N" => Value::Boolean(false),
            (FieldType::Bytes, v @ Value::Blob(..)) => v,
            (
                FieldType::Text {
                    max_length,
                    accept_empty,
                },
                Value::Varchar(v),
            ) => {
                if v.is_empty() && !accept_empty {
                    return Err(self.error(&Value::Varchar(v), ValidationReason::Empty));
                }
                let length = v.chars().count();
                if length > *max_length {
                    return Err(self.error(
                        &Value::Varchar(v),
                        ValidationReason::TooLong {
                            max_length: *max_length,
                            length,
                        },
                    ));
                }
                Value::Varchar(v)
            }
            (FieldType::Date, v @ Value::Date(..)) => v,
            (FieldType::Date, Value::Timestamp(v)) => Value::Date(v.date()),
            (FieldType::Date, Value::Varchar(v)) => match parse_date(&v) {
                Ok(date) => Value::Date(date),
                Err(e) => return Err(malformed(&Value::Varchar(v), &e)),
            },
            (FieldType::DateTime, v @ Value::Timestamp(..)) => v,
            (FieldType::DateTime, Value::Varchar(v)) => match parse_timestamp(&v) {
                Ok(timestamp) => Value::Timestamp(timestamp),
                Err(e) => return Err(malformed(&Value::Varchar(v), &e)),
            },
            (FieldType::Time, v @ Value::Time(..)) => v,
            (FieldType::Time, Value::Varchar(v)) => match parse_time(&v) {
                Ok(time) => Value::Time(time),
                Err(e) => return Err(malformed(&Value::Varchar(v), &e)),
            },
            (FieldType::Decimal, v @ Value::Decimal(..)) => v,
            (FieldType::Decimal, Value::Int64(v)) => Value::Decimal(Decimal::from(v)),
            (FieldType::Decimal, Value::Float64(v)) => {
                // Shortest representation, 0.1 stays 0.1
                match v.to_string().parse::<Decimal>() {
                    Ok(decimal) => Value::Decimal(decimal),
                    Err(e) => return Err(malformed(&Value::Float64(v), &e)),
                }
            }
            (FieldType::Decimal, Value::Varchar(v)) => match v.trim().parse::<Decimal>() {
                Ok(decimal) => Value::Decimal(decimal),
                Err(e) => return Err(malformed(&Value::Varchar(v), &e)),
            },
            (FieldType::Int, v @ Value::Int64(..)) => v,
            (FieldType::Reference(..), v) if !matches!(v, Value::List(..)) => v,
            (_, v) => return Err(wrong_type(&v)),
        })
    }
}

impl Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("column", &self.column)
            .field("field_type", &self.field_type)
            .field("nullable", &self.nullable)
            .field("default", &self.default)
            .field("choices", &self.choices)
            .field("display", &self.display.is_some())
            .field("primary_key", &self.primary_key)
            .finish()
    }
}

/// A typed slot holding the value of one attribute.
///
/// Every assignment goes through [`FieldDef::normalize`]: on failure the error is returned and
/// the previous value is kept.
#[derive(Clone)]
pub struct Field {
    def: Arc<FieldDef>,
    value: Value,
    target: Option<Box<Record>>,
}

impl Field {
    /// New field holding the default value (or null).
    pub fn new(def: impl Into<Arc<FieldDef>>) -> std::result::Result<Self, ValidationError> {
        let def = def.into();
        let value = match &def.default {
            Some(default) => def.normalize(default.clone())?,
            None => Value::Null,
        };
        Ok(Self {
            def,
            value,
            target: None,
        })
    }

    /// Field from a definition whose default was already normalized by the schema.
    pub(crate) fn prepared(def: Arc<FieldDef>) -> Self {
        let value = def.default.clone().unwrap_or_default();
        Self {
            def,
            value,
            target: None,
        }
    }

    pub fn def(&self) -> &FieldDef {
        &self.def
    }
    pub fn name(&self) -> &str {
        &self.def.name
    }
    pub fn get(&self) -> &Value {
        &self.value
    }
    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }
    /// The record a reference field points to.
    pub fn referenced(&self) -> Option<&Record> {
        self.target.as_deref()
    }

    pub fn set(&mut self, value: impl Into<Value>) -> std::result::Result<(), ValidationError> {
        let value = value.into();
        if self.def.reference_target().is_some() && !value.is_null() {
            return Err(self.def.error(&value, ValidationReason::Unresolved));
        }
        self.value = self.def.normalize(value)?;
        self.target = None;
        Ok(())
    }

    /// Parse `text` with a `time` format description (`[day]/[month]/[year]`).
    pub fn set_formatted(
        &mut self,
        text: &str,
        pattern: &str,
    ) -> std::result::Result<(), ValidationError> {
        let original = Value::Varchar(text.into());
        let format = parse_borrowed::<2>(pattern)
            .map_err(|e| self.def.error(&original, ValidationReason::Malformed(e.to_string())))?;
        let parsed = match self.def.field_type {
            FieldType::Date => Date::parse(text, format.as_slice()).map(Value::Date),
            FieldType::DateTime => {
                PrimitiveDateTime::parse(text, format.as_slice()).map(Value::Timestamp)
            }
            FieldType::Time => Time::parse(text, format.as_slice()).map(Value::Time),
            _ => {
                return Err(self.def.error(
                    &original,
                    ValidationReason::WrongType {
                        expected: self.def.field_type.name(),
                        found: "formatted text",
                    },
                ));
            }
        };
        let value = parsed
            .map_err(|e| self.def.error(&original, ValidationReason::Malformed(e.to_string())))?;
        self.set(value)
    }

    /// Point a reference field to `record`, storing its key.
    pub fn set_record(&mut self, record: Record) -> std::result::Result<(), ValidationError> {
        let Some(target) = self.def.reference_target() else {
            return Err(self.def.error(
                &Value::Varchar(record.table_name().into()),
                ValidationReason::WrongType {
                    expected: self.def.field_type.name(),
                    found: "record",
                },
            ));
        };
        if !Arc::ptr_eq(target, record.schema()) && target.table_name() != record.table_name() {
            return Err(self.def.error(
                &Value::Varchar(record.table_name().into()),
                ValidationReason::ForeignSchema {
                    expected: target.table_name().into(),
                    found: record.table_name().into(),
                },
            ));
        }
        let key = record.primary_key().cloned().unwrap_or_default();
        if key.is_null() {
            return Err(self
                .def
                .error(&Value::Varchar(record.to_string()), ValidationReason::MissingKey));
        }
        let key = self.def.normalize(key)?;
        self.value = key;
        self.target = Some(Box::new(record));
        Ok(())
    }

    /// Assign a value, loading the referenced record through `lookup` when this is a reference
    /// field. The lookup receives the target schema and the key.
    pub fn resolve<F>(&mut self, value: impl Into<Value>, lookup: F) -> Result<()>
    where
        F: FnOnce(&Arc<Schema>, &Value) -> Result<Option<Record>>,
    {
        let value = value.into();
        let Some(target) = self.def.reference_target().cloned() else {
            return Ok(self.set(value)?);
        };
        if value.is_null() {
            return Ok(self.set(value)?);
        }
        match lookup(&target, &value)? {
            Some(record) => Ok(self.set_record(record)?),
            None => Err(self.def.error(&value, ValidationReason::NotFound).into()),
        }
    }

    /// The value from the display formatter, or the stored one.
    pub fn display(&self) -> Cow<'_, Value> {
        match &self.def.display {
            Some(formatter) if !self.value.is_null() => Cow::Owned(formatter(&self.value)),
            _ => Cow::Borrowed(&self.value),
        }
    }

    /// The value bound to statements.
    pub fn storage_value(&self) -> Value {
        self.value.to_storage()
    }
}

impl Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.def.name)
            .field("value", &self.value)
            .field("referenced", &self.target.as_ref().map(|v| v.table_name()))
            .finish()
    }
}
