//! Dynamic scalar values for bound parameters and decoded result cells.
//!
//! Redshift infers parameter types from the statement, so a [`Value`] encodes
//! itself into whatever type the server asks for (for example a text value
//! bound against a `DATE` column is parsed into a date before it is sent).

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::ser::{Serialize, Serializer};
use std::error::Error;
use std::fmt::Write as _;
use std::str::FromStr;
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type};

type BoxError = Box<dyn Error + Sync + Send>;

/// A single column value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// SQL NULL
    #[default]
    Null,
    Bool(bool),
    /// Any integer column (`SMALLINT`, `INTEGER`, `BIGINT`)
    Int(i64),
    /// `REAL` / `DOUBLE PRECISION`
    Float(f64),
    /// `NUMERIC` / `DECIMAL`
    Decimal(Decimal),
    /// `VARCHAR`, `CHAR`, `TEXT` and anything else sent as text
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    /// `TIMESTAMP` (without time zone)
    Timestamp(NaiveDateTime),
    /// `TIMESTAMPTZ`
    TimestampTz(DateTime<Utc>),
    /// `INTERVAL`, in the server's month/day/microsecond representation
    Interval {
        months: i32,
        days: i32,
        microseconds: i64,
    },
    Json(serde_json::Value),
    /// `VARBYTE` / `BYTEA`, and the raw wire bytes of column types with no
    /// mapping of their own
    Bytes(Vec<u8>),
}

impl Value {
    /// Whether this is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Timestamp(_) => "timestamp",
            Value::TimestampTz(_) => "timestamptz",
            Value::Interval { .. } => "interval",
            Value::Json(_) => "json",
            Value::Bytes(_) => "bytes",
        }
    }

    /// Integer view of the value.
    ///
    /// Decimals without a fractional part (Redshift returns `COUNT(*)` over
    /// some views as `NUMERIC`) and numeric text also convert.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Decimal(d) if d.fract().is_zero() => i64::try_from(*d).ok(),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Decimal(d) => f64::try_from(*d).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    fn interval_text(&self) -> String {
        match self {
            Value::Interval {
                months,
                days,
                microseconds,
            } => format!("{months} months {days} days {microseconds} microseconds"),
            _ => String::new(),
        }
    }

    /// Render the value as a SQL literal.
    ///
    /// Used for the interpolated (inspection-only) SQL text; execution always
    /// binds values as parameters.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) if v.is_finite() => v.to_string(),
            Value::Float(v) => format!("'{v}'::float8"),
            Value::Decimal(d) => d.to_string(),
            Value::Text(s) => quote_literal(s),
            Value::Date(d) => format!("'{d}'"),
            Value::Time(t) => format!("'{t}'"),
            Value::Timestamp(ts) => format!("'{ts}'"),
            Value::TimestampTz(ts) => format!("'{}'", ts.to_rfc3339()),
            Value::Interval { .. } => format!("INTERVAL '{}'", self.interval_text()),
            Value::Json(v) => quote_literal(&v.to_string()),
            Value::Bytes(b) => {
                let mut hex = String::with_capacity(b.len() * 2);
                for byte in b {
                    let _ = write!(hex, "{byte:02x}");
                }
                format!("from_hex('{hex}')")
            }
        }
    }
}

/// Quote a string as a SQL literal.
///
/// Redshift treats backslash as an escape character inside literals, so both
/// quotes and backslashes are doubled.
pub fn quote_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

fn is_text_type(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::XML | Type::UNKNOWN
    )
}

fn encode_int(v: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(v)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(v)?.to_sql(ty, out),
        Type::INT8 => v.to_sql(ty, out),
        Type::OID => u32::try_from(v)?.to_sql(ty, out),
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::FLOAT8 => (v as f64).to_sql(ty, out),
        Type::NUMERIC => Decimal::from(v).to_sql(ty, out),
        Type::BOOL => (v != 0).to_sql(ty, out),
        _ if is_text_type(ty) => v.to_string().as_str().to_sql(ty, out),
        _ => Err(format!("cannot bind an integer as {ty}").into()),
    }
}

fn encode_float(v: f64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::FLOAT8 => v.to_sql(ty, out),
        Type::NUMERIC => Decimal::try_from(v)?.to_sql(ty, out),
        _ if is_text_type(ty) => v.to_string().as_str().to_sql(ty, out),
        _ => Err(format!("cannot bind a float as {ty}").into()),
    }
}

fn encode_decimal(d: &Decimal, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::NUMERIC => d.to_sql(ty, out),
        Type::FLOAT4 | Type::FLOAT8 => {
            let v = f64::try_from(*d)?;
            encode_float(v, ty, out)
        }
        Type::INT2 | Type::INT4 | Type::INT8 if d.fract().is_zero() => {
            encode_int(i64::try_from(*d)?, ty, out)
        }
        _ if is_text_type(ty) => d.to_string().as_str().to_sql(ty, out),
        _ => Err(format!("cannot bind a decimal as {ty}").into()),
    }
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, BoxError> {
    let s = s.trim();
    if let Ok(ts) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(ts);
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(ts);
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")?;
    Ok(date.and_time(NaiveTime::MIN))
}

fn parse_timestamptz(s: &str) -> Result<DateTime<Utc>, BoxError> {
    match DateTime::parse_from_rfc3339(s.trim()) {
        Ok(ts) => Ok(ts.with_timezone(&Utc)),
        Err(_) => Ok(parse_timestamp(s)?.and_utc()),
    }
}

/// Encode text into the parameter type the server inferred.
fn encode_text(s: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::BOOL => bool::from_str(s.trim())?.to_sql(ty, out),
        Type::INT2 | Type::INT4 | Type::INT8 | Type::OID => {
            encode_int(s.trim().parse::<i64>()?, ty, out)
        }
        Type::FLOAT4 | Type::FLOAT8 => encode_float(s.trim().parse::<f64>()?, ty, out),
        Type::NUMERIC => Decimal::from_str(s.trim())?.to_sql(ty, out),
        Type::DATE => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?.to_sql(ty, out),
        Type::TIME => NaiveTime::from_str(s.trim())?.to_sql(ty, out),
        Type::TIMESTAMP => parse_timestamp(s)?.to_sql(ty, out),
        Type::TIMESTAMPTZ => parse_timestamptz(s)?.to_sql(ty, out),
        Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out),
        _ if is_text_type(ty) || is_bytes_type(ty) => s.to_sql(ty, out),
        _ => Err(format!("cannot bind text as {ty}").into()),
    }
}

fn mismatch(value: &Value, ty: &Type) -> BoxError {
    format!("cannot bind a {} as {ty}", value.kind()).into()
}

/// Redshift `VARBYTE` and its aliases have no builtin OID.
fn is_bytes_type(ty: &Type) -> bool {
    *ty == Type::BYTEA || matches!(ty.name(), "varbyte" | "varbinary" | "binary varying")
}

fn encode_interval(
    months: i32,
    days: i32,
    microseconds: i64,
    out: &mut BytesMut,
) -> Result<IsNull, BoxError> {
    out.extend_from_slice(&microseconds.to_be_bytes());
    out.extend_from_slice(&days.to_be_bytes());
    out.extend_from_slice(&months.to_be_bytes());
    Ok(IsNull::No)
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => match *ty {
                Type::BOOL => v.to_sql(ty, out),
                _ if is_text_type(ty) => v.to_string().as_str().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Int(v) => encode_int(*v, ty, out),
            Value::Float(v) => encode_float(*v, ty, out),
            Value::Decimal(d) => encode_decimal(d, ty, out),
            Value::Text(s) => encode_text(s, ty, out),
            Value::Date(d) => match *ty {
                Type::DATE => d.to_sql(ty, out),
                Type::TIMESTAMP => d.and_time(NaiveTime::MIN).to_sql(ty, out),
                Type::TIMESTAMPTZ => d.and_time(NaiveTime::MIN).and_utc().to_sql(ty, out),
                _ if is_text_type(ty) => d.to_string().as_str().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Time(t) => match *ty {
                Type::TIME => t.to_sql(ty, out),
                _ if is_text_type(ty) => t.to_string().as_str().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Timestamp(ts) => match *ty {
                Type::TIMESTAMP => ts.to_sql(ty, out),
                Type::TIMESTAMPTZ => ts.and_utc().to_sql(ty, out),
                Type::DATE => ts.date().to_sql(ty, out),
                _ if is_text_type(ty) => ts.to_string().as_str().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::TimestampTz(ts) => match *ty {
                Type::TIMESTAMPTZ => ts.to_sql(ty, out),
                Type::TIMESTAMP => ts.naive_utc().to_sql(ty, out),
                Type::DATE => ts.date_naive().to_sql(ty, out),
                _ if is_text_type(ty) => ts.to_rfc3339().as_str().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Interval {
                months,
                days,
                microseconds,
            } => match *ty {
                Type::INTERVAL => encode_interval(*months, *days, *microseconds, out),
                _ if is_text_type(ty) => self.interval_text().as_str().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Json(v) => match *ty {
                Type::JSON | Type::JSONB => v.to_sql(ty, out),
                _ if is_text_type(ty) => v.to_string().as_str().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Bytes(b) if is_bytes_type(ty) => {
                out.extend_from_slice(b);
                Ok(IsNull::No)
            }
            Value::Bytes(_) => Err(mismatch(self, ty)),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

fn decode_interval(raw: &[u8]) -> Result<Value, BoxError> {
    let raw: [u8; 16] = raw
        .try_into()
        .map_err(|_| format!("invalid interval length {}", raw.len()))?;
    let (micros, rest) = raw.split_at(8);
    let (days, months) = rest.split_at(4);
    Ok(Value::Interval {
        months: i32::from_be_bytes(months.try_into()?),
        days: i32::from_be_bytes(days.try_into()?),
        microseconds: i64::from_be_bytes(micros.try_into()?),
    })
}

impl<'a> FromSql<'a> for Value {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let value = match *ty {
            Type::BOOL => Value::Bool(bool::from_sql(ty, raw)?),
            Type::INT2 => Value::Int(i16::from_sql(ty, raw)?.into()),
            Type::INT4 => Value::Int(i32::from_sql(ty, raw)?.into()),
            Type::INT8 => Value::Int(i64::from_sql(ty, raw)?),
            Type::OID => Value::Int(u32::from_sql(ty, raw)?.into()),
            Type::CHAR => Value::Text(char::from(i8::from_sql(ty, raw)? as u8).to_string()),
            Type::FLOAT4 => Value::Float(f32::from_sql(ty, raw)?.into()),
            Type::FLOAT8 => Value::Float(f64::from_sql(ty, raw)?),
            Type::NUMERIC => Value::Decimal(Decimal::from_sql(ty, raw)?),
            Type::DATE => Value::Date(NaiveDate::from_sql(ty, raw)?),
            Type::TIME => Value::Time(NaiveTime::from_sql(ty, raw)?),
            Type::TIMESTAMP => Value::Timestamp(NaiveDateTime::from_sql(ty, raw)?),
            Type::TIMESTAMPTZ => Value::TimestampTz(DateTime::<Utc>::from_sql(ty, raw)?),
            Type::JSON | Type::JSONB => Value::Json(serde_json::Value::from_sql(ty, raw)?),
            Type::INTERVAL => decode_interval(raw)?,
            _ if is_text_type(ty) => Value::Text(String::from_sql(ty, raw)?),
            // VARBYTE, GEOMETRY, TIMETZ, ...: keep the wire bytes untouched.
            _ => Value::Bytes(raw.to_vec()),
        };
        Ok(value)
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, BoxError> {
        Ok(Value::Null)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Decimal(d) => serializer.collect_str(d),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Date(d) => serializer.collect_str(d),
            Value::Time(t) => serializer.collect_str(t),
            Value::Timestamp(ts) => serializer.collect_str(ts),
            Value::TimestampTz(ts) => serializer.serialize_str(&ts.to_rfc3339()),
            Value::Interval { .. } => serializer.serialize_str(&self.interval_text()),
            Value::Json(v) => v.serialize(serializer),
            Value::Bytes(b) => serializer.serialize_bytes(b),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident $(as $conv:ty)?),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v $(as $conv)?)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int,
    u8 => Int as i64,
    u16 => Int as i64,
    u32 => Int as i64,
    f32 => Float as f64,
    f64 => Float,
    Decimal => Decimal,
    String => Text,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => TimestampTz,
    serde_json::Value => Json,
    Vec<u8> => Bytes,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
