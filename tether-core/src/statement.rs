use crate::{Operator, Value, param_name, truncate_long};
use indexmap::IndexMap;
use std::fmt::{self, Display};

/// Named bind parameters, in the order they were bound.
pub type Params = IndexMap<String, Value>;

/// Bind `value` under a name derived from `name`, unique within `params`. Returns the name used.
pub fn bind_param(params: &mut Params, name: &str, value: Value) -> String {
    let base = param_name(name);
    let mut name = base.clone();
    let mut i = 1;
    while params.contains_key(&name) {
        i += 1;
        name = format!("{}_{}", base, i);
    }
    params.insert(name.clone(), value);
    name
}

/// SQL text with the parameters it references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Params,
}

impl Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", truncate_long!(self.sql))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    IsNull,
    IsNotNull,
    /// Column compared to a single parameter.
    Binary(Operator, String),
    /// Column compared to a parameter list (`IN`, `NOT IN`).
    List(Operator, Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub comparison: Comparison,
}

impl Condition {
    /// Equality on `value`, bound in `params`, or `IS NULL` when the value is null.
    pub fn equal(params: &mut Params, column: &str, param: &str, value: Value) -> Self {
        let comparison = if value.is_null() {
            Comparison::IsNull
        } else {
            Comparison::Binary(Operator::Eq, bind_param(params, param, value))
        };
        Self {
            column: column.into(),
            comparison,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTerm {
    pub column: String,
    pub descending: bool,
}

impl OrderTerm {
    /// `-age` sorts descending on `age`, anything else ascending.
    pub fn parse(term: &str) -> Self {
        match term.strip_prefix('-') {
            Some(column) => Self {
                column: column.into(),
                descending: true,
            },
            None => Self {
                column: term.into(),
                descending: false,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
    pub table: String,
    pub columns: Vec<String>,
    pub distinct: bool,
    pub conditions: Vec<Condition>,
    pub order: Vec<OrderTerm>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Insert {
    pub table: String,
    /// Pairs of column and parameter name.
    pub values: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub table: String,
    /// Pairs of column and parameter name.
    pub assignments: Vec<(String, String)>,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delete {
    pub table: String,
    pub conditions: Vec<Condition>,
}
