//! [`Executor`] for `tokio-postgres` clients and transactions.
//!
//! Values bind through [`ToSql`] with integer and float widths adapted to the
//! parameter type the server inferred, and result rows are converted into
//! dialect-neutral [`Row`]s by column type.

use crate::client::Executor;
use crate::error::{OrmError, OrmResult};
use crate::fragment::SqlCommand;
use crate::row::Row;
use crate::value::Value;
use bytes::BytesMut;
use rust_decimal::Decimal;
use std::error::Error;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type};

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql(ty, out),
            Value::I16(v) => integer_to_sql(i64::from(*v), ty, out),
            Value::I32(v) => integer_to_sql(i64::from(*v), ty, out),
            Value::I64(v) => integer_to_sql(*v, ty, out),
            Value::F32(v) => match *ty {
                Type::FLOAT8 => f64::from(*v).to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::F64(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Decimal(v) => v.to_sql(ty, out),
            Value::String(v) => v.as_str().to_sql(ty, out),
            Value::Bytes(v) => v.as_slice().to_sql(ty, out),
            Value::Uuid(v) => v.to_sql(ty, out),
            Value::Date(v) => v.to_sql(ty, out),
            Value::Time(v) => v.to_sql(ty, out),
            Value::DateTime(v) => v.to_sql(ty, out),
            Value::DateTimeTz(v) => v.to_sql(ty, out),
            Value::Json(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

/// Integers are widened or narrowed to the parameter's declared width.
fn integer_to_sql(
    v: i64,
    ty: &Type,
    out: &mut BytesMut,
) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
    match *ty {
        Type::INT2 => i16::try_from(v)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(v)?.to_sql(ty, out),
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::FLOAT8 => (v as f64).to_sql(ty, out),
        Type::NUMERIC => Decimal::from(v).to_sql(ty, out),
        _ => v.to_sql(ty, out),
    }
}

fn bind(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

async fn with_timeout<T, F>(timeout: Option<Duration>, future: F) -> OrmResult<T>
where
    F: Future<Output = Result<T, tokio_postgres::Error>>,
{
    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, future)
            .await
            .map_err(|_| OrmError::Timeout(timeout))?
            .map_err(OrmError::from),
        None => future.await.map_err(OrmError::from),
    }
}

fn get<'a, T>(row: &'a tokio_postgres::Row, idx: usize, column: &str) -> OrmResult<Value>
where
    T: FromSql<'a> + Into<Value>,
{
    row.try_get::<_, Option<T>>(idx)
        .map(Value::from)
        .map_err(|e| OrmError::decode(column, e.to_string()))
}

/// `money` as its raw count of cents, surfaced as a scale-2 decimal.
struct Money(i64);

impl<'a> FromSql<'a> for Money {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        i64::from_sql(ty, raw).map(Money)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::MONEY
    }
}

impl From<Money> for Value {
    fn from(m: Money) -> Self {
        Value::Decimal(Decimal::new(m.0, 2))
    }
}

/// `xml` documents travel as UTF-8 text.
struct Xml(String);

impl<'a> FromSql<'a> for Xml {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(Xml(std::str::from_utf8(raw)?.to_string()))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::XML
    }
}

impl From<Xml> for Value {
    fn from(x: Xml) -> Self {
        Value::String(x.0)
    }
}

fn convert_value(row: &tokio_postgres::Row, idx: usize, column: &str, ty: &Type) -> OrmResult<Value> {
    match *ty {
        Type::BOOL => get::<bool>(row, idx, column),
        Type::INT2 => get::<i16>(row, idx, column),
        Type::INT4 => get::<i32>(row, idx, column),
        Type::INT8 => get::<i64>(row, idx, column),
        Type::OID => row
            .try_get::<_, Option<u32>>(idx)
            .map(|v| Value::from(v.map(i64::from)))
            .map_err(|e| OrmError::decode(column, e.to_string())),
        Type::FLOAT4 => get::<f32>(row, idx, column),
        Type::FLOAT8 => get::<f64>(row, idx, column),
        Type::NUMERIC => get::<Decimal>(row, idx, column),
        Type::MONEY => get::<Money>(row, idx, column),
        Type::BYTEA => get::<Vec<u8>>(row, idx, column),
        Type::UUID => get::<uuid::Uuid>(row, idx, column),
        Type::DATE => get::<chrono::NaiveDate>(row, idx, column),
        Type::TIME => get::<chrono::NaiveTime>(row, idx, column),
        Type::TIMESTAMP => get::<chrono::NaiveDateTime>(row, idx, column),
        Type::TIMESTAMPTZ => get::<chrono::DateTime<chrono::Utc>>(row, idx, column),
        Type::JSON | Type::JSONB => get::<serde_json::Value>(row, idx, column),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            get::<String>(row, idx, column)
        }
        Type::XML => get::<Xml>(row, idx, column),
        _ => Err(OrmError::decode(column, format!("unsupported column type {ty}"))),
    }
}

fn convert_rows(rows: &[tokio_postgres::Row]) -> OrmResult<Vec<Row>> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let columns: Arc<[String]> = first.columns().iter().map(|c| c.name().to_string()).collect();
    rows.iter()
        .map(|row| {
            let values = row
                .columns()
                .iter()
                .enumerate()
                .map(|(idx, c)| convert_value(row, idx, c.name(), c.type_()))
                .collect::<OrmResult<Vec<_>>>()?;
            Ok(Row::new(columns.clone(), values))
        })
        .collect()
}

impl Executor for tokio_postgres::Client {
    async fn query(&self, command: &SqlCommand) -> OrmResult<Vec<Row>> {
        let params = bind(&command.params);
        let rows = with_timeout(
            command.timeout,
            tokio_postgres::Client::query(self, command.sql.as_str(), &params),
        )
        .await?;
        convert_rows(&rows)
    }

    async fn execute(&self, command: &SqlCommand) -> OrmResult<u64> {
        let params = bind(&command.params);
        with_timeout(
            command.timeout,
            tokio_postgres::Client::execute(self, command.sql.as_str(), &params),
        )
        .await
    }
}

impl Executor for tokio_postgres::Transaction<'_> {
    async fn query(&self, command: &SqlCommand) -> OrmResult<Vec<Row>> {
        let params = bind(&command.params);
        let rows = with_timeout(
            command.timeout,
            tokio_postgres::Transaction::query(self, command.sql.as_str(), &params),
        )
        .await?;
        convert_rows(&rows)
    }

    async fn execute(&self, command: &SqlCommand) -> OrmResult<u64> {
        let params = bind(&command.params);
        with_timeout(
            command.timeout,
            tokio_postgres::Transaction::execute(self, command.sql.as_str(), &params),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_adapt_to_parameter_width() {
        let mut out = BytesMut::new();
        Value::I64(7).to_sql(&Type::INT4, &mut out).unwrap();
        assert_eq!(&out[..], &7i32.to_be_bytes());

        let mut out = BytesMut::new();
        Value::I32(7).to_sql(&Type::INT8, &mut out).unwrap();
        assert_eq!(&out[..], &7i64.to_be_bytes());

        let mut out = BytesMut::new();
        assert!(Value::I64(i64::MAX).to_sql(&Type::INT2, &mut out).is_err());
    }

    #[test]
    fn money_decodes_as_cents() {
        let raw = 12345i64.to_be_bytes();
        let value = Value::from(Money::from_sql(&Type::MONEY, &raw).unwrap());
        assert_eq!(value, Value::Decimal(Decimal::new(12345, 2)));
        assert_eq!(value, Value::Decimal("123.45".parse().unwrap()));

        let raw = (-50i64).to_be_bytes();
        let value = Value::from(Money::from_sql(&Type::MONEY, &raw).unwrap());
        assert_eq!(value, Value::Decimal(Decimal::new(-50, 2)));

        assert!(Money::from_sql(&Type::MONEY, &[0, 1]).is_err());
        assert!(<Money as FromSql>::accepts(&Type::MONEY));
        assert!(!<Money as FromSql>::accepts(&Type::INT8));
    }

    #[test]
    fn xml_decodes_as_text() {
        let doc = "<order id=\"1\"/>";
        let value = Value::from(Xml::from_sql(&Type::XML, doc.as_bytes()).unwrap());
        assert_eq!(value, Value::String(doc.to_string()));

        assert!(Xml::from_sql(&Type::XML, &[0xff, 0xfe]).is_err());
        assert!(<Xml as FromSql>::accepts(&Type::XML));
    }

    #[test]
    fn null_binds_as_null() {
        let mut out = BytesMut::new();
        assert!(matches!(Value::Null.to_sql(&Type::TEXT, &mut out).unwrap(), IsNull::Yes));
        assert!(out.is_empty());
    }

    #[test]
    fn floats_follow_declared_width() {
        let mut out = BytesMut::new();
        Value::F32(1.5).to_sql(&Type::FLOAT8, &mut out).unwrap();
        assert_eq!(&out[..], &1.5f64.to_be_bytes());
    }
}
