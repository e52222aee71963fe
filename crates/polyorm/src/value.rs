//! Bound parameter values.
//!
//! A [`Value`] is a literal extracted from a predicate or a model instance. Values are
//! never interpolated into SQL text: they travel next to the text as an ordered
//! parameter list and are bound by the executor.

use crate::error::{OrmError, OrmResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use uuid::Uuid;

/// A dialect-neutral literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    String(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    DateTimeTz(DateTime<Utc>),
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short type name used in decode errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Uuid(_) => "uuid",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::DateTimeTz(_) => "datetimetz",
            Value::Json(_) => "json",
        }
    }

    /// Widen any integer variant to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I16(v) => Some(i64::from(*v)),
            Value::I32(v) => Some(i64::from(*v)),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_value! {
    bool => Bool,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    Decimal => Decimal,
    String => String,
    Vec<u8> => Bytes,
    Uuid => Uuid,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => DateTime,
    DateTime<Utc> => DateTimeTz,
    serde_json::Value => Json,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::String(v.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Conversion out of a [`Value`], used when reading rows and scalars.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> OrmResult<Self>;
}

fn mismatch<T>(expected: &str, value: &Value) -> OrmResult<T> {
    Err(OrmError::decode(
        "<value>",
        format!("expected {expected}, got {}", value.type_name()),
    ))
}

impl FromValue for Value {
    fn from_value(value: &Value) -> OrmResult<Self> {
        Ok(value.clone())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> OrmResult<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            // SQL Server BIT columns surface as integers through some drivers
            Value::I16(_) | Value::I32(_) | Value::I64(_) => Ok(value.as_i64() != Some(0)),
            other => mismatch("bool", other),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> OrmResult<Self> {
        match value.as_i64() {
            Some(v) => Ok(v),
            None => match value {
                Value::Decimal(d) => d
                    .to_i64()
                    .ok_or_else(|| OrmError::decode("<value>", format!("{d} out of i64 range"))),
                other => mismatch("integer", other),
            },
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> OrmResult<Self> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide).map_err(|e| OrmError::decode("<value>", e.to_string()))
    }
}

impl FromValue for i16 {
    fn from_value(value: &Value) -> OrmResult<Self> {
        let wide = i64::from_value(value)?;
        i16::try_from(wide).map_err(|e| OrmError::decode("<value>", e.to_string()))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> OrmResult<Self> {
        match value {
            Value::F64(v) => Ok(*v),
            Value::F32(v) => Ok(f64::from(*v)),
            other => match other.as_i64() {
                Some(v) => Ok(v as f64),
                None => mismatch("float", other),
            },
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> OrmResult<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => mismatch("string", other),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> OrmResult<Self> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            other => mismatch("bytes", other),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: &Value) -> OrmResult<Self> {
        match value {
            Value::Uuid(u) => Ok(*u),
            Value::String(s) => {
                Uuid::parse_str(s).map_err(|e| OrmError::decode("<value>", e.to_string()))
            }
            other => mismatch("uuid", other),
        }
    }
}

impl FromValue for Decimal {
    fn from_value(value: &Value) -> OrmResult<Self> {
        match value {
            Value::Decimal(d) => Ok(*d),
            other => match other.as_i64() {
                Some(v) => Ok(Decimal::from(v)),
                None => mismatch("decimal", other),
            },
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: &Value) -> OrmResult<Self> {
        match value {
            Value::Date(d) => Ok(*d),
            Value::DateTime(dt) => Ok(dt.date()),
            other => mismatch("date", other),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value) -> OrmResult<Self> {
        match value {
            Value::DateTime(dt) => Ok(*dt),
            other => mismatch("datetime", other),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> OrmResult<Self> {
        match value {
            Value::DateTimeTz(dt) => Ok(*dt),
            other => mismatch("datetimetz", other),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: &Value) -> OrmResult<Self> {
        match value {
            Value::Json(v) => Ok(v.clone()),
            other => mismatch("json", other),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> OrmResult<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}
