use bytes::BytesMut;
use postgres::types::{FromSql, IsNull, ToSql, Type, to_sql_checked};
use rust_decimal::Decimal;
use std::error::Error;
use tether_core::Value;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

#[derive(Debug)]
pub(crate) struct ValueHolder(pub(crate) Value);

impl From<Value> for ValueHolder {
    fn from(value: Value) -> Self {
        ValueHolder(value)
    }
}

impl<'a> FromSql<'a> for ValueHolder {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        let value = match *ty {
            Type::BOOL => Value::Boolean(bool::from_sql(ty, raw)?),
            Type::INT2 => Value::Int64(i16::from_sql(ty, raw)?.into()),
            Type::INT4 => Value::Int64(i32::from_sql(ty, raw)?.into()),
            Type::INT8 => Value::Int64(i64::from_sql(ty, raw)?),
            Type::OID => Value::Int64(u32::from_sql(ty, raw)?.into()),
            Type::FLOAT4 => Value::Float64(f32::from_sql(ty, raw)?.into()),
            Type::FLOAT8 => Value::Float64(f64::from_sql(ty, raw)?),
            Type::NUMERIC => Value::Decimal(Decimal::from_sql(ty, raw)?),
            Type::VARCHAR
            | Type::TEXT
            | Type::NAME
            | Type::BPCHAR
            | Type::JSON
            | Type::XML
            | Type::UNKNOWN => Value::Varchar(String::from_sql(ty, raw)?),
            Type::BYTEA => Value::Blob(<&[u8]>::from_sql(ty, raw)?.into()),
            Type::DATE => Value::Date(Date::from_sql(ty, raw)?),
            Type::TIME => Value::Time(Time::from_sql(ty, raw)?),
            Type::TIMESTAMP => Value::Timestamp(PrimitiveDateTime::from_sql(ty, raw)?),
            Type::TIMESTAMPTZ => {
                let value = OffsetDateTime::from_sql(ty, raw)?.to_offset(UtcOffset::UTC);
                Value::Timestamp(PrimitiveDateTime::new(value.date(), value.time()))
            }
            _ => {
                return Err(
                    tether_core::Error::msg(format!("Cannot decode sql type `{}`", ty)).into(),
                );
            }
        };
        Ok(value.into())
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(Value::Null.into())
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

impl ToSql for ValueHolder {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>>
    where
        Self: Sized,
    {
        match (&self.0, ty) {
            (Value::Null, _) => Ok(IsNull::Yes),
            (Value::Boolean(v), &Type::BOOL) => v.to_sql_checked(ty, out),
            (Value::Boolean(v), _) => (if *v { "Y" } else { "N" }).to_sql_checked(ty, out),
            (Value::Varchar(v), &Type::BOOL) if v == "Y" || v == "N" => {
                (v == "Y").to_sql_checked(ty, out)
            }
            (Value::Int64(v), &Type::INT2) => i16::try_from(*v)?.to_sql_checked(ty, out),
            (Value::Int64(v), &Type::INT4) => i32::try_from(*v)?.to_sql_checked(ty, out),
            (Value::Int64(v), &Type::NUMERIC) => Decimal::from(*v).to_sql_checked(ty, out),
            (Value::Int64(v), _) => v.to_sql_checked(ty, out),
            (Value::Float64(v), &Type::FLOAT4) => (*v as f32).to_sql_checked(ty, out),
            (Value::Float64(v), &Type::NUMERIC) => Decimal::try_from(*v)?.to_sql_checked(ty, out),
            (Value::Float64(v), _) => v.to_sql_checked(ty, out),
            (Value::Decimal(v), _) => v.to_sql_checked(ty, out),
            (Value::Varchar(v), _) => v.to_sql_checked(ty, out),
            (Value::Blob(v), _) => v.as_ref().to_sql_checked(ty, out),
            (Value::Date(v), _) => v.to_sql_checked(ty, out),
            (Value::Time(v), _) => v.to_sql_checked(ty, out),
            (Value::Timestamp(v), &Type::TIMESTAMPTZ) => v.assume_utc().to_sql_checked(ty, out),
            (Value::Timestamp(v), _) => v.to_sql_checked(ty, out),
            (Value::List(..), _) => Err(tether_core::Error::msg(format!(
                "A list cannot be bound as one parameter: {}",
                self.0
            ))
            .into()),
        }
    }

    fn accepts(_ty: &Type) -> bool
    where
        Self: Sized,
    {
        true
    }

    to_sql_checked!();
}
