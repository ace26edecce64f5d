// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Type Mapping Logic
//!
//! This module is the "Translator". Oracle and the publisher protocol speak
//! different languages when it comes to data types. This module ensures that a
//! `NUMBER(10,0)` in Oracle becomes an `INTEGER` property, that an
//! `INTERVAL DAY(4) TO SECOND(2)` is rendered as `+0120 06:31:14.00`, and so on.
//!
//! We map each Oracle type to three different things:
//! 1. **Property Type**: The abstract type announced in discovery (e.g., `STRING`).
//! 2. **Encoding**: How a fetched value is written into a record's JSON.
//! 3. **Decoding**: How a JSON value from a write-back record becomes a bind value.
//!
//! Everything here is a pure function of the type descriptor, so adding a new
//! Oracle type only touches this file.

use crate::domain::entities::PropertyType;
use crate::domain::errors::{ConnectorError, Result};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike};
use serde_json::Value;
use std::fmt;

/// Character columns wider than this are announced as `TEXT`.
const LONG_CHARACTER_THRESHOLD: u32 = 1024;

/// Scale Oracle reports for a `NUMBER` declared without precision.
const UNCONSTRAINED_SCALE: i8 = -127;

/// Native Oracle column or parameter type, independent of the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeType {
    Char(u32),
    NChar(u32),
    Varchar2(u32),
    NVarchar2(u32),
    Long,
    Clob,
    NClob,
    Xml,
    Json,
    Rowid,
    /// `precision == 0 && scale == -127` is a bare `NUMBER`.
    Number { precision: u8, scale: i8 },
    Integer,
    Float(u8),
    BinaryFloat,
    BinaryDouble,
    Date,
    Timestamp(u8),
    TimestampTz(u8),
    TimestampLtz(u8),
    /// Leading (year) precision.
    IntervalYearToMonth(u8),
    /// Leading (day) precision and fractional-second precision.
    IntervalDayToSecond(u8, u8),
    Raw(u32),
    LongRaw,
    Blob,
    Bfile,
    Boolean,
    Other(String),
}

impl NativeType {
    /// A bare `NUMBER` with no declared precision or scale.
    pub fn unconstrained_number() -> Self {
        NativeType::Number {
            precision: 0,
            scale: UNCONSTRAINED_SCALE,
        }
    }

    /// Builds a descriptor from data-dictionary columns (`ALL_TAB_COLUMNS`, `ALL_ARGUMENTS`).
    ///
    /// `data_type` may carry inline arguments (`TIMESTAMP(6) WITH TIME ZONE`,
    /// `INTERVAL DAY(4) TO SECOND(2)`); those win over the separate columns.
    pub fn from_catalog(
        data_type: &str,
        length: Option<u32>,
        precision: Option<u32>,
        scale: Option<i32>,
    ) -> Self {
        let upper = data_type.trim().to_uppercase();
        let (base, args) = split_type_arguments(&upper);
        let arg = |i: usize| args.get(i).copied();
        let len = arg(0).or(length).unwrap_or(1);
        let narrow = |v: u32| u8::try_from(v).unwrap_or(u8::MAX);

        match base.as_str() {
            "CHAR" | "CHARACTER" => NativeType::Char(len),
            "NCHAR" => NativeType::NChar(len),
            "VARCHAR2" | "VARCHAR" => NativeType::Varchar2(len),
            "NVARCHAR2" => NativeType::NVarchar2(len),
            "LONG" => NativeType::Long,
            "CLOB" => NativeType::Clob,
            "NCLOB" => NativeType::NClob,
            "XMLTYPE" | "SYS.XMLTYPE" | "PUBLIC.XMLTYPE" => NativeType::Xml,
            "JSON" => NativeType::Json,
            "ROWID" | "UROWID" => NativeType::Rowid,
            "NUMBER" | "NUMERIC" | "DECIMAL" => match arg(0).or(precision) {
                Some(p) => NativeType::Number {
                    precision: narrow(p),
                    scale: arg(1)
                        .map(|s| s as i32)
                        .or(scale)
                        .map(|s| i8::try_from(s).unwrap_or(0))
                        .unwrap_or(0),
                },
                None => match scale {
                    Some(s) if s != UNCONSTRAINED_SCALE as i32 => NativeType::Number {
                        precision: 0,
                        scale: i8::try_from(s).unwrap_or(0),
                    },
                    _ => NativeType::unconstrained_number(),
                },
            },
            "INTEGER" | "INT" | "SMALLINT" | "PLS_INTEGER" | "BINARY_INTEGER" => {
                NativeType::Integer
            }
            "FLOAT" | "DOUBLE PRECISION" | "REAL" => {
                NativeType::Float(narrow(arg(0).or(precision).unwrap_or(126)))
            }
            "BINARY_FLOAT" => NativeType::BinaryFloat,
            "BINARY_DOUBLE" => NativeType::BinaryDouble,
            "DATE" => NativeType::Date,
            "TIMESTAMP" => NativeType::Timestamp(fraction_digits(arg(0), scale)),
            "TIMESTAMP WITH TIME ZONE" => NativeType::TimestampTz(fraction_digits(arg(0), scale)),
            "TIMESTAMP WITH LOCAL TIME ZONE" => {
                NativeType::TimestampLtz(fraction_digits(arg(0), scale))
            }
            "INTERVAL YEAR TO MONTH" => {
                NativeType::IntervalYearToMonth(narrow(arg(0).or(precision).unwrap_or(2)))
            }
            "INTERVAL DAY TO SECOND" => NativeType::IntervalDayToSecond(
                narrow(arg(0).or(precision).unwrap_or(2)),
                narrow(
                    arg(1)
                        .or_else(|| scale.and_then(|s| u32::try_from(s).ok()))
                        .unwrap_or(6),
                ),
            ),
            "RAW" => NativeType::Raw(len),
            "LONG RAW" => NativeType::LongRaw,
            "BLOB" => NativeType::Blob,
            "BFILE" => NativeType::Bfile,
            "BOOLEAN" | "PL/SQL BOOLEAN" => NativeType::Boolean,
            other if other.ends_with("XMLTYPE") => NativeType::Xml,
            other => NativeType::Other(other.to_string()),
        }
    }
}

fn fraction_digits(inline: Option<u32>, scale: Option<i32>) -> u8 {
    inline
        .or_else(|| scale.and_then(|s| u32::try_from(s).ok()))
        .and_then(|v| u8::try_from(v).ok())
        .unwrap_or(6)
}

/// Splits `INTERVAL DAY(4) TO SECOND(2)` into (`INTERVAL DAY TO SECOND`, [4, 2]).
fn split_type_arguments(data_type: &str) -> (String, Vec<u32>) {
    let mut base = String::with_capacity(data_type.len());
    let mut args = Vec::new();
    let mut rest = data_type;

    while let Some(open) = rest.find('(') {
        base.push_str(&rest[..open]);
        let Some(close) = rest[open..].find(')') else {
            rest = &rest[open..];
            break;
        };
        for part in rest[open + 1..open + close].split(',') {
            let digits: String = part.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
            if let Ok(v) = digits.parse() {
                args.push(v);
            }
        }
        rest = &rest[open + close + 1..];
    }
    base.push_str(rest);

    let normalized = base.split_whitespace().collect::<Vec<_>>().join(" ");
    (normalized, args)
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeType::Char(n) => write!(f, "CHAR({})", n),
            NativeType::NChar(n) => write!(f, "NCHAR({})", n),
            NativeType::Varchar2(n) => write!(f, "VARCHAR2({})", n),
            NativeType::NVarchar2(n) => write!(f, "NVARCHAR2({})", n),
            NativeType::Long => write!(f, "LONG"),
            NativeType::Clob => write!(f, "CLOB"),
            NativeType::NClob => write!(f, "NCLOB"),
            NativeType::Xml => write!(f, "XMLTYPE"),
            NativeType::Json => write!(f, "JSON"),
            NativeType::Rowid => write!(f, "ROWID"),
            NativeType::Number { precision, scale } => match (*precision, *scale) {
                (0, s) if s == UNCONSTRAINED_SCALE => write!(f, "NUMBER"),
                (0, s) => write!(f, "NUMBER(*,{})", s),
                (p, 0) => write!(f, "NUMBER({})", p),
                (p, s) => write!(f, "NUMBER({},{})", p, s),
            },
            NativeType::Integer => write!(f, "INTEGER"),
            NativeType::Float(p) => write!(f, "FLOAT({})", p),
            NativeType::BinaryFloat => write!(f, "BINARY_FLOAT"),
            NativeType::BinaryDouble => write!(f, "BINARY_DOUBLE"),
            NativeType::Date => write!(f, "DATE"),
            NativeType::Timestamp(_) => write!(f, "TIMESTAMP"),
            NativeType::TimestampTz(_) => write!(f, "TIMESTAMP WITH TIME ZONE"),
            NativeType::TimestampLtz(_) => write!(f, "TIMESTAMP WITH LOCAL TIME ZONE"),
            NativeType::IntervalYearToMonth(p) => write!(f, "INTERVAL YEAR({}) TO MONTH", p),
            NativeType::IntervalDayToSecond(p, s) => {
                write!(f, "INTERVAL DAY({}) TO SECOND({})", p, s)
            }
            NativeType::Raw(n) => write!(f, "RAW({})", n),
            NativeType::LongRaw => write!(f, "LONG RAW"),
            NativeType::Blob => write!(f, "BLOB"),
            NativeType::Bfile => write!(f, "BFILE"),
            NativeType::Boolean => write!(f, "BOOLEAN"),
            NativeType::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Returns the abstract property type announced for an Oracle type.
pub fn map_native_type(native: &NativeType) -> PropertyType {
    match native {
        NativeType::Char(n)
        | NativeType::NChar(n)
        | NativeType::Varchar2(n)
        | NativeType::NVarchar2(n) => {
            if *n > LONG_CHARACTER_THRESHOLD {
                PropertyType::Text
            } else {
                PropertyType::String
            }
        }
        NativeType::Long => PropertyType::Text,

        // `NUMBER(*,0)` has no precision but is still integral; a bare
        // `NUMBER` carries the -127 scale and stays FLOAT.
        NativeType::Number { scale, .. } => {
            if *scale == 0 {
                PropertyType::Integer
            } else {
                PropertyType::Float
            }
        }
        NativeType::Integer => PropertyType::Integer,
        NativeType::Float(_) | NativeType::BinaryFloat | NativeType::BinaryDouble => {
            PropertyType::Float
        }

        NativeType::Date
        | NativeType::Timestamp(_)
        | NativeType::TimestampTz(_)
        | NativeType::TimestampLtz(_) => PropertyType::Datetime,

        NativeType::Boolean => PropertyType::Bool,

        // Intervals, LOBs, binary data, XML and JSON documents all travel as strings.
        NativeType::IntervalYearToMonth(_)
        | NativeType::IntervalDayToSecond(_, _)
        | NativeType::Clob
        | NativeType::NClob
        | NativeType::Xml
        | NativeType::Json
        | NativeType::Rowid
        | NativeType::Raw(_)
        | NativeType::LongRaw
        | NativeType::Blob
        | NativeType::Bfile
        | NativeType::Other(_) => PropertyType::String,
    }
}

/// Components of an `INTERVAL DAY TO SECOND` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DaySecondInterval {
    pub days: i32,
    pub hours: i32,
    pub minutes: i32,
    pub seconds: i32,
    pub nanoseconds: i32,
}

/// A value fetched from Oracle, before encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Null,
    Text(String),
    /// Oracle `NUMBER` kept as its exact decimal text.
    Number(String),
    BinaryFloat(f32),
    BinaryDouble(f64),
    /// `offset` is `None` for types without a time zone.
    Timestamp {
        value: NaiveDateTime,
        offset: Option<FixedOffset>,
    },
    IntervalYearToMonth {
        years: i32,
        months: i32,
    },
    IntervalDayToSecond(DaySecondInterval),
    Bytes(Vec<u8>),
    Boolean(bool),
}

/// A typed value bound to a placeholder (`:1`, `:2`, ...).
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Timestamp(DateTime<FixedOffset>),
    Boolean(bool),
}

/// Encodes a fetched value into the JSON written to a record.
pub fn encode_value(native: &NativeType, value: &NativeValue) -> Value {
    let property_type = map_native_type(native);

    match value {
        // Empty string and NULL are indistinguishable for character properties.
        NativeValue::Null if property_type.is_textual() => Value::String(String::new()),
        NativeValue::Null => Value::Null,
        NativeValue::Text(s) => match property_type {
            PropertyType::Integer | PropertyType::Float => encode_number(s, property_type),
            _ => Value::String(s.clone()),
        },
        NativeValue::Number(s) => encode_number(s, property_type),
        NativeValue::BinaryFloat(v) => float_value(widen_binary_float(*v)),
        NativeValue::BinaryDouble(v) => float_value(*v),
        NativeValue::Timestamp { value, offset } => {
            Value::String(format_timestamp(value, *offset))
        }
        NativeValue::IntervalYearToMonth { years, months } => {
            let precision = match native {
                NativeType::IntervalYearToMonth(p) => *p,
                _ => 2,
            };
            Value::String(format_interval_year_to_month(*years, *months, precision))
        }
        NativeValue::IntervalDayToSecond(interval) => {
            let (day_precision, fraction_precision) = match native {
                NativeType::IntervalDayToSecond(p, s) => (*p, *s),
                _ => (2, 6),
            };
            Value::String(format_interval_day_to_second(
                interval,
                day_precision,
                fraction_precision,
            ))
        }
        NativeValue::Bytes(bytes) => Value::String(general_purpose::STANDARD.encode(bytes)),
        NativeValue::Boolean(b) => match property_type {
            PropertyType::Bool => Value::Bool(*b),
            _ => Value::String(b.to_string()),
        },
    }
}

fn encode_number(text: &str, property_type: PropertyType) -> Value {
    let trimmed = text.trim();
    if property_type == PropertyType::Integer {
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::from(i);
        }
        if let Ok(u) = trimmed.parse::<u64>() {
            return Value::from(u);
        }
        // Wider than 64 bits: keep every digit rather than rounding through f64.
        if is_integer_literal(trimmed) {
            return Value::String(trimmed.to_string());
        }
    }
    match trimmed.parse::<f64>() {
        Ok(v) => float_value(v),
        Err(_) => Value::String(text.to_string()),
    }
}

fn is_integer_literal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn float_value(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(v.to_string()))
}

/// Widens a `BINARY_FLOAT` through its shortest decimal form, so 0.13f32 becomes 0.13.
pub fn widen_binary_float(v: f32) -> f64 {
    v.to_string().parse::<f64>().unwrap_or(v as f64)
}

/// Formats a timestamp as RFC 3339, keeping the stored offset verbatim.
///
/// Fractional seconds are printed only when present, without trailing zeros.
/// Values without a time zone are reported as UTC (`Z`).
pub fn format_timestamp(value: &NaiveDateTime, offset: Option<FixedOffset>) -> String {
    let mut out = value.format("%Y-%m-%dT%H:%M:%S").to_string();

    let nanos = value.nanosecond() % 1_000_000_000;
    if nanos > 0 {
        let digits = format!("{:09}", nanos);
        out.push('.');
        out.push_str(digits.trim_end_matches('0'));
    }

    match offset {
        Some(o) if o.local_minus_utc() != 0 => out.push_str(&o.to_string()),
        _ => out.push('Z'),
    }
    out
}

/// `+02-04` for 2 years 4 months with a leading precision of 2.
pub fn format_interval_year_to_month(years: i32, months: i32, precision: u8) -> String {
    let sign = if years < 0 || months < 0 { '-' } else { '+' };
    format!(
        "{}{:0width$}-{:02}",
        sign,
        years.unsigned_abs(),
        months.unsigned_abs(),
        width = precision as usize
    )
}

/// `+0120 06:31:14.00` for DAY(4) TO SECOND(2).
pub fn format_interval_day_to_second(
    interval: &DaySecondInterval,
    day_precision: u8,
    fraction_precision: u8,
) -> String {
    let negative = interval.days < 0
        || interval.hours < 0
        || interval.minutes < 0
        || interval.seconds < 0
        || interval.nanoseconds < 0;
    let mut out = format!(
        "{}{:0width$} {:02}:{:02}:{:02}",
        if negative { '-' } else { '+' },
        interval.days.unsigned_abs(),
        interval.hours.unsigned_abs(),
        interval.minutes.unsigned_abs(),
        interval.seconds.unsigned_abs(),
        width = day_precision as usize
    );

    let digits = usize::from(fraction_precision.min(9));
    if digits > 0 {
        let nanos = format!("{:09}", interval.nanoseconds.unsigned_abs());
        out.push('.');
        out.push_str(&nanos[..digits]);
    }
    out
}

/// Decodes a JSON value from a write-back record into a bind value.
///
/// Missing values, `null` and empty strings for non-character types all bind as NULL.
pub fn decode_value(property_type: PropertyType, value: &Value) -> Result<BindValue> {
    if value.is_null() {
        return Ok(BindValue::Null);
    }
    if let Value::String(s) = value {
        if s.is_empty() && !property_type.is_textual() {
            return Ok(BindValue::Null);
        }
    }

    match property_type {
        PropertyType::Integer => match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(BindValue::Integer)
                .ok_or_else(|| ConnectorError::Decode(format!("{} is not an integer", n))),
            Value::String(s) => parse_integer(s).map(BindValue::Integer),
            Value::Bool(b) => Ok(BindValue::Integer(i64::from(*b))),
            other => Err(ConnectorError::Decode(format!("{} is not an integer", other))),
        },
        PropertyType::Float | PropertyType::Decimal => match value {
            Value::Number(n) => n
                .as_f64()
                .map(BindValue::Float)
                .ok_or_else(|| ConnectorError::Decode(format!("{} is not a number", n))),
            Value::String(s) => parse_float(s).map(BindValue::Float),
            other => Err(ConnectorError::Decode(format!("{} is not a number", other))),
        },
        PropertyType::Datetime | PropertyType::Date => match value {
            Value::String(s) => parse_datetime(s).map(BindValue::Timestamp),
            other => Err(ConnectorError::Decode(format!("{} is not a timestamp", other))),
        },
        PropertyType::Bool => match value {
            Value::Bool(b) => Ok(BindValue::Boolean(*b)),
            Value::Number(n) => Ok(BindValue::Boolean(n.as_f64().unwrap_or(0.0) != 0.0)),
            Value::String(s) => parse_bool(s).map(BindValue::Boolean),
            other => Err(ConnectorError::Decode(format!("{} is not a boolean", other))),
        },
        _ => Ok(BindValue::Text(match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })),
    }
}

pub fn parse_integer(text: &str) -> Result<i64> {
    text.trim()
        .parse::<i64>()
        .map_err(|_| ConnectorError::Decode(format!("'{}' is not an integer", text)))
}

pub fn parse_float(text: &str) -> Result<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| ConnectorError::Decode(format!("'{}' is not a number", text)))
}

pub fn parse_bool(text: &str) -> Result<bool> {
    match text.trim().to_lowercase().as_str() {
        "true" | "1" | "y" | "yes" => Ok(true),
        "false" | "0" | "n" | "no" => Ok(false),
        _ => Err(ConnectorError::Decode(format!("'{}' is not a boolean", text))),
    }
}

/// Parses RFC 3339 first, then offset-less date-times and plain dates as UTC.
pub fn parse_datetime(text: &str) -> Result<DateTime<FixedOffset>> {
    let trimmed = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt);
    }

    let utc = FixedOffset::east_opt(0).ok_or_else(|| {
        ConnectorError::Decode("UTC offset is out of range".to_string())
    })?;
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc().with_timezone(&utc));
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc().with_timezone(&utc));
    }

    Err(ConnectorError::Decode(format!(
        "'{}' is not an RFC 3339 timestamp",
        text
    )))
}
