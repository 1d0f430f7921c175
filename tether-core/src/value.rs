use crate::{Error, Result};
use rust_decimal::Decimal;
use std::{
    any,
    fmt::{self, Display, Write},
};
use time::{Date, PrimitiveDateTime, Time, format_description::parse_borrowed};

/// Dynamically typed value moving between fields, statement parameters and result rows.
#[derive(Default, Debug, Clone, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Int64(i64),
    Float64(f64),
    Decimal(Decimal),
    Varchar(String),
    Blob(Box<[u8]>),
    Date(Date),
    Time(Time),
    Timestamp(PrimitiveDateTime),
    /// Only meaningful as the right hand side of `in` / `not_in` filters.
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(..) => "boolean",
            Value::Int64(..) => "integer",
            Value::Float64(..) => "float",
            Value::Decimal(..) => "decimal",
            Value::Varchar(..) => "text",
            Value::Blob(..) => "bytes",
            Value::Date(..) => "date",
            Value::Time(..) => "time",
            Value::Timestamp(..) => "timestamp",
            Value::List(..) => "list",
        }
    }

    pub fn list<T: Into<Value>>(values: impl IntoIterator<Item = T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(v) => Some(*v),
            _ => None,
        }
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Varchar(v) => Some(v),
            _ => None,
        }
    }
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(v) => Some(v),
            _ => None,
        }
    }
    pub fn as_date(&self) -> Option<Date> {
        match self {
            Value::Date(v) => Some(*v),
            _ => None,
        }
    }
    pub fn as_time(&self) -> Option<Time> {
        match self {
            Value::Time(v) => Some(*v),
            _ => None,
        }
    }
    pub fn as_timestamp(&self) -> Option<PrimitiveDateTime> {
        match self {
            Value::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    /// The representation bound to statements: booleans travel as the `'Y'`/`'N'` codes.
    pub fn to_storage(&self) -> Value {
        match self {
            Value::Boolean(v) => Value::Varchar(if *v { "Y" } else { "N" }.into()),
            Value::List(v) => Value::List(v.iter().map(Value::to_storage).collect()),
            v => v.clone(),
        }
    }
}

fn write_date(out: &mut impl Write, value: &Date) -> fmt::Result {
    write!(
        out,
        "{:04}-{:02}-{:02}",
        value.year(),
        value.month() as u8,
        value.day()
    )
}

fn write_time(out: &mut impl Write, value: &Time) -> fmt::Result {
    write!(
        out,
        "{:02}:{:02}:{:02}",
        value.hour(),
        value.minute(),
        value.second()
    )?;
    let mut subsecond = value.nanosecond();
    if subsecond != 0 {
        let mut width = 9;
        while subsecond % 10 == 0 {
            subsecond /= 10;
            width -= 1;
        }
        write!(out, ".{:0width$}", subsecond)?;
    }
    Ok(())
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::Varchar(v) => f.write_str(v),
            Value::Blob(v) => {
                f.write_str("0x")?;
                for b in v.iter() {
                    write!(f, "{:02X}", b)?;
                }
                Ok(())
            }
            Value::Date(v) => write_date(f, v),
            Value::Time(v) => write_time(f, v),
            Value::Timestamp(v) => {
                write_date(f, &v.date())?;
                f.write_char(' ')?;
                write_time(f, &v.time())
            }
            Value::List(v) => {
                f.write_char('(')?;
                for (i, item) in v.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_char(')')
            }
        }
    }
}

macro_rules! parse_temporal {
    ($ty:ty, $value:expr, $($formats:literal),+ $(,)?) => {{
        let value: &str = $value.trim();
        let mut result = None;
        for format in [$($formats,)+] {
            let format = parse_borrowed::<2>(format)?;
            if let Ok(parsed) = <$ty>::parse(value, format.as_slice()) {
                result = Some(parsed);
                break;
            }
        }
        result.ok_or_else(|| {
            Error::msg(format!(
                "Cannot parse `{}` as {}",
                value,
                any::type_name::<$ty>()
            ))
        })
    }};
}

/// Parse an ISO 8601 date (`2024-01-31`).
pub fn parse_date(value: &str) -> Result<Date> {
    parse_temporal!(Date, value, "[year]-[month]-[day]")
}

/// Parse an ISO 8601 time, seconds and subseconds optional.
pub fn parse_time(value: &str) -> Result<Time> {
    parse_temporal!(
        Time,
        value,
        "[hour]:[minute]:[second].[subsecond]",
        "[hour]:[minute]:[second]",
        "[hour]:[minute]",
    )
}

/// Parse an ISO 8601 timestamp using either `T` or a space as separator.
pub fn parse_timestamp(value: &str) -> Result<PrimitiveDateTime> {
    parse_temporal!(
        PrimitiveDateTime,
        value,
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]",
        "[year]-[month]-[day]T[hour]:[minute]:[second]",
        "[year]-[month]-[day]T[hour]:[minute]",
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]",
        "[year]-[month]-[day] [hour]:[minute]:[second]",
        "[year]-[month]-[day] [hour]:[minute]",
    )
}

macro_rules! impl_from {
    ($variant:ident, $($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for Value {
                fn from(value: $source) -> Self {
                    Value::$variant(value.into())
                }
            }
        )+
    };
}

impl_from!(Boolean, bool);
impl_from!(Int64, i8, i16, i32, i64, u8, u16, u32);
impl_from!(Float64, f32, f64);
impl_from!(Decimal, Decimal);
impl_from!(Varchar, String, &str, &String);
impl_from!(Blob, Vec<u8>, &[u8], Box<[u8]>);
impl_from!(Date, Date);
impl_from!(Time, Time);
impl_from!(Timestamp, PrimitiveDateTime);

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}
