use crate::{Error, FieldDef, FieldType, Record, Result};
use std::{
    any,
    collections::HashMap,
    fmt::{self, Debug},
    sync::Arc,
};

/// Callbacks invoked by [`Record`] around persistence.
pub trait Hooks: Send + Sync {
    /// After a row was loaded into the record.
    fn on_load(&self, _record: &mut Record) {}
    /// After the record was written.
    fn on_save(&self, _record: &mut Record) {}
}

/// Fields of a record type with their table, built once per type.
pub struct Schema {
    table: String,
    fields: Vec<Arc<FieldDef>>,
    primary_key: Option<usize>,
    by_attribute: HashMap<String, usize>,
    by_column: HashMap<String, usize>,
    hooks: Option<Arc<dyn Hooks>>,
}

impl Schema {
    pub fn builder(table: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            table: table.into(),
            fields: Vec::new(),
            hooks: None,
        }
    }

    /// Builder with the table named after the type (`Person` for `app::model::Person`).
    pub fn builder_for<T: ?Sized>() -> SchemaBuilder {
        let name = any::type_name::<T>();
        let name = name.split('<').next().unwrap_or(name);
        Self::builder(name.rsplit("::").next().unwrap_or(name))
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }
    pub fn fields(&self) -> &[Arc<FieldDef>] {
        &self.fields
    }
    pub fn field(&self, attribute: &str) -> Option<&FieldDef> {
        self.position(attribute).map(|i| self.fields[i].as_ref())
    }
    pub fn primary_key(&self) -> Option<&FieldDef> {
        self.primary_key.map(|i| self.fields[i].as_ref())
    }
    pub(crate) fn primary_key_position(&self) -> Option<usize> {
        self.primary_key
    }
    pub fn hooks(&self) -> Option<&Arc<dyn Hooks>> {
        self.hooks.as_ref()
    }
    /// Index of the field declared with the attribute name.
    pub fn position(&self, attribute: &str) -> Option<usize> {
        self.by_attribute.get(attribute).copied()
    }
    /// Index of the field stored in the column, matched exactly first and then ignoring ASCII case.
    pub fn position_by_column(&self, column: &str) -> Option<usize> {
        self.by_column.get(column).copied().or_else(|| {
            self.by_column
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(column))
                .map(|(_, v)| *v)
        })
    }
    /// Index of the field named either by attribute or by column.
    pub fn resolve(&self, name: &str) -> Option<usize> {
        self.position(name)
            .or_else(|| self.position_by_column(name))
    }
    pub fn column_name(&self, attribute: &str) -> Option<&str> {
        self.field(attribute).map(FieldDef::column_name)
    }
    pub fn attribute_name(&self, column: &str) -> Option<&str> {
        self.position_by_column(column)
            .map(|i| self.fields[i].name())
    }
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|v| v.column_name())
    }
}

impl Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("table", &self.table)
            .field("fields", &self.fields)
            .field("primary_key", &self.primary_key)
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

pub struct SchemaBuilder {
    table: String,
    fields: Vec<FieldDef>,
    hooks: Option<Arc<dyn Hooks>>,
}

impl SchemaBuilder {
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }
    pub fn hooks(mut self, hooks: impl Hooks + 'static) -> Self {
        self.hooks = Some(Arc::new(hooks));
        self
    }

    /// Check the declarations and normalize the defaults.
    pub fn build(self) -> Result<Arc<Schema>> {
        let table = self.table;
        let error = |message: String| {
            let error = Error::msg(message);
            log::error!("{:#}", error);
            error
        };
        if table.is_empty() {
            return Err(error("The table name cannot be empty".into()));
        }
        let mut fields = Vec::with_capacity(self.fields.len());
        let mut primary_key = None;
        let mut by_attribute = HashMap::new();
        let mut by_column = HashMap::new();
        for (i, mut field) in self.fields.into_iter().enumerate() {
            if field.name.is_empty() || field.column_name().is_empty() {
                return Err(error(format!("Field {} of `{}` has an empty name", i, table)));
            }
            if by_attribute.insert(field.name.clone(), i).is_some() {
                return Err(error(format!(
                    "Attribute `{}` is declared twice in `{}`",
                    field.name, table
                )));
            }
            if by_column.insert(field.column_name().to_string(), i).is_some() {
                return Err(error(format!(
                    "Column `{}` is used twice in `{}`",
                    field.column_name(),
                    table
                )));
            }
            if field.primary_key {
                if let Some(previous) = primary_key.replace(i) {
                    return Err(error(format!(
                        "`{}` declares both `{}` and `{}` as primary key",
                        table,
                        fields
                            .get(previous)
                            .map(|v: &Arc<FieldDef>| v.name())
                            .unwrap_or_default(),
                        field.name
                    )));
                }
            }
            if let Some(default) = field.default.take() {
                if matches!(field.field_type, FieldType::Reference(..)) {
                    return Err(error(format!(
                        "Reference field `{}` of `{}` cannot have a default",
                        field.name, table
                    )));
                }
                let default = field.normalize(default).map_err(|e| {
                    let e = Error::new(e).context(format!("Invalid default in `{}`", table));
                    log::error!("{:#}", e);
                    e
                })?;
                field.default = Some(default);
            }
            fields.push(Arc::new(field));
        }
        Ok(Arc::new(Schema {
            table,
            fields,
            primary_key,
            by_attribute,
            by_column,
            hooks: self.hooks,
        }))
    }
}
