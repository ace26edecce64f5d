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

//! Bridges between the `oracle` driver types and the domain's native types.

use crate::domain::errors::{ConnectorError, Result};
use crate::domain::mapping::{BindValue, DaySecondInterval, NativeType, NativeValue};
use chrono::{FixedOffset, NaiveDate, NaiveDateTime};
use oracle::sql_type::{IntervalDS, IntervalYM, OracleType, Timestamp, ToSql};
use oracle::Row;

/// Maps the driver's column type onto a `NativeType`.
pub fn native_type(oracle_type: &OracleType) -> NativeType {
    match oracle_type {
        OracleType::Varchar2(n) => NativeType::Varchar2(*n),
        OracleType::NVarchar2(n) => NativeType::NVarchar2(*n),
        OracleType::Char(n) => NativeType::Char(*n),
        OracleType::NChar(n) => NativeType::NChar(*n),
        OracleType::Rowid => NativeType::Rowid,
        OracleType::Raw(n) => NativeType::Raw(*n),
        OracleType::BinaryFloat => NativeType::BinaryFloat,
        OracleType::BinaryDouble => NativeType::BinaryDouble,
        OracleType::Number(precision, scale) => NativeType::Number {
            precision: *precision,
            scale: *scale,
        },
        OracleType::Float(precision) => NativeType::Float(*precision),
        OracleType::Date => NativeType::Date,
        OracleType::Timestamp(fsprec) => NativeType::Timestamp(*fsprec),
        OracleType::TimestampTZ(fsprec) => NativeType::TimestampTz(*fsprec),
        OracleType::TimestampLTZ(fsprec) => NativeType::TimestampLtz(*fsprec),
        OracleType::IntervalYM(lfprec) => NativeType::IntervalYearToMonth(*lfprec),
        OracleType::IntervalDS(lfprec, fsprec) => NativeType::IntervalDayToSecond(*lfprec, *fsprec),
        OracleType::CLOB => NativeType::Clob,
        OracleType::NCLOB => NativeType::NClob,
        OracleType::BLOB => NativeType::Blob,
        OracleType::BFILE => NativeType::Bfile,
        OracleType::Long => NativeType::Long,
        OracleType::LongRaw => NativeType::LongRaw,
        OracleType::Boolean => NativeType::Boolean,
        OracleType::Int64 => NativeType::Integer,
        // Object types (XMLTYPE and friends) and anything newer than this match.
        other => NativeType::from_catalog(&other.to_string(), None, None, None),
    }
}

/// Reads column `index` of `row` according to its native type.
pub fn native_value(row: &Row, index: usize, native: &NativeType) -> Result<NativeValue> {
    let value = match native {
        NativeType::Number { .. } | NativeType::Integer | NativeType::Float(_) => row
            .get::<usize, Option<String>>(index)?
            .map(NativeValue::Number),
        NativeType::BinaryFloat => row
            .get::<usize, Option<f32>>(index)?
            .map(NativeValue::BinaryFloat),
        NativeType::BinaryDouble => row
            .get::<usize, Option<f64>>(index)?
            .map(NativeValue::BinaryDouble),
        NativeType::Date | NativeType::Timestamp(_) => row
            .get::<usize, Option<Timestamp>>(index)?
            .map(|ts| timestamp_value(&ts, false))
            .transpose()?,
        NativeType::TimestampTz(_) | NativeType::TimestampLtz(_) => row
            .get::<usize, Option<Timestamp>>(index)?
            .map(|ts| timestamp_value(&ts, true))
            .transpose()?,
        NativeType::IntervalYearToMonth(_) => {
            row.get::<usize, Option<IntervalYM>>(index)?
                .map(|iv| NativeValue::IntervalYearToMonth {
                    years: iv.years(),
                    months: iv.months(),
                })
        }
        NativeType::IntervalDayToSecond(..) => {
            row.get::<usize, Option<IntervalDS>>(index)?.map(|iv| {
                NativeValue::IntervalDayToSecond(DaySecondInterval {
                    days: iv.days(),
                    hours: iv.hours(),
                    minutes: iv.minutes(),
                    seconds: iv.seconds(),
                    nanoseconds: iv.nanoseconds(),
                })
            })
        }
        NativeType::Raw(_) | NativeType::LongRaw | NativeType::Blob | NativeType::Bfile => row
            .get::<usize, Option<Vec<u8>>>(index)?
            .map(NativeValue::Bytes),
        NativeType::Boolean => row
            .get::<usize, Option<bool>>(index)?
            .map(NativeValue::Boolean),
        _ => row
            .get::<usize, Option<String>>(index)?
            .map(NativeValue::Text),
    };
    Ok(value.unwrap_or(NativeValue::Null))
}

/// Converts a driver timestamp, keeping its offset only for zoned types.
pub fn timestamp_value(ts: &Timestamp, zoned: bool) -> Result<NativeValue> {
    let out_of_range = || ConnectorError::Decode(format!("timestamp {} is out of range", ts));
    let value: NaiveDateTime = NaiveDate::from_ymd_opt(ts.year(), ts.month(), ts.day())
        .and_then(|d| d.and_hms_nano_opt(ts.hour(), ts.minute(), ts.second(), ts.nanosecond()))
        .ok_or_else(out_of_range)?;
    let offset = if zoned {
        Some(FixedOffset::east_opt(ts.tz_offset()).ok_or_else(out_of_range)?)
    } else {
        None
    };
    Ok(NativeValue::Timestamp { value, offset })
}

/// Owned bind values; borrow them with `as_params` when executing.
pub fn to_sql_values(binds: &[BindValue]) -> Vec<Box<dyn ToSql>> {
    binds
        .iter()
        .map(|bind| -> Box<dyn ToSql> {
            match bind {
                BindValue::Null => Box::new(Option::<String>::None),
                BindValue::Text(s) => Box::new(s.clone()),
                BindValue::Integer(i) => Box::new(*i),
                BindValue::Float(f) => Box::new(*f),
                BindValue::Timestamp(dt) => Box::new(*dt),
                BindValue::Boolean(b) => Box::new(*b),
            }
        })
        .collect()
}

pub fn as_params(values: &[Box<dyn ToSql>]) -> Vec<&dyn ToSql> {
    values.iter().map(|v| v.as_ref()).collect()
}
