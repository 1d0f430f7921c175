use std::fmt::{self, Display};

/// Comparison selected by the `__<op>` suffix of a filter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operator {
    #[default]
    Eq,
    Not,
    Like,
    NotLike,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
}

impl Operator {
    pub fn from_suffix(suffix: &str) -> Option<Operator> {
        Some(match suffix {
            "not" => Operator::Not,
            "like" => Operator::Like,
            "not_like" => Operator::NotLike,
            "lt" => Operator::Lt,
            "lte" => Operator::Lte,
            "gt" => Operator::Gt,
            "gte" => Operator::Gte,
            "in" => Operator::In,
            "not_in" => Operator::NotIn,
            _ => return None,
        })
    }

    pub fn sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Not => "<>",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql())
    }
}

/// A parsed filter key: `age__gte` is attribute `age` with operator `>=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterKey<'a> {
    pub attribute: &'a str,
    pub operator: Operator,
}

impl<'a> FilterKey<'a> {
    /// Keys whose suffix is not a known operator are equality on the whole key.
    pub fn parse(key: &'a str) -> Self {
        if let Some((attribute, suffix)) = key.rsplit_once("__")
            && !attribute.is_empty()
            && let Some(operator) = Operator::from_suffix(suffix)
        {
            return Self {
                attribute,
                operator,
            };
        }
        Self {
            attribute: key,
            operator: Operator::Eq,
        }
    }
}

/// Build a list of `(key, Value)` filters from `key = value` pairs.
///
/// ```ignore
/// query.get(Mode::Records, filters!(age__gte = 18, name__like = "A%"))?;
/// ```
#[macro_export]
macro_rules! filters {
    () => {
        ::std::vec::Vec::<(&'static str, $crate::Value)>::new()
    };
    ($($key:ident = $value:expr),+ $(,)?) => {
        ::std::vec![$((stringify!($key), $crate::Value::from($value))),+]
    };
}
