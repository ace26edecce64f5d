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

//! Translates publish filters into a parameterized `WHERE` restriction.
//!
//! Filter values arrive as strings. Each one is parsed according to the type
//! of the property it targets and bound positionally (`:1`, `:2`, ...); the
//! only text spliced into the clause is the re-quoted column identifier.

use crate::domain::entities::{FilterKind, Property, PropertyType, PublishFilter};
use crate::domain::errors::{ConnectorError, Result};
use crate::domain::mapping::{parse_bool, parse_datetime, parse_float, parse_integer, BindValue};
use crate::domain::sql::{parse_identifier, quote_identifier};

/// One translated comparison, kept in structured form next to the SQL.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Unquoted column name.
    pub column: String,
    pub kind: FilterKind,
    pub value: BindValue,
}

/// A `WHERE` clause body plus its ordered bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct Restriction {
    pub clause: String,
    pub binds: Vec<BindValue>,
    /// The same comparisons in structured form, for `DatabaseSession`
    /// implementations that evaluate rows themselves instead of running SQL.
    pub predicates: Vec<Predicate>,
}

impl FilterKind {
    pub fn operator(self) -> &'static str {
        match self {
            FilterKind::Equals => "=",
            FilterKind::GreaterThan => ">",
            FilterKind::LessThan => "<",
        }
    }
}

/// Builds the restriction for `filters`, or `None` when there are none.
pub fn translate(properties: &[Property], filters: &[PublishFilter]) -> Result<Option<Restriction>> {
    if filters.is_empty() {
        return Ok(None);
    }

    let mut predicates = Vec::with_capacity(filters.len());
    for filter in filters {
        let property = properties
            .iter()
            .find(|p| p.id == filter.property_id)
            .ok_or_else(|| {
                ConnectorError::Filter(format!("unknown property '{}'", filter.property_id))
            })?;

        let column = parse_identifier(&property.id)
            .map_err(|e| ConnectorError::Filter(e.to_string()))?;
        let value = typed_value(property.property_type, &filter.value).map_err(|e| {
            ConnectorError::Filter(format!("property '{}': {}", property.name, e))
        })?;

        predicates.push(Predicate {
            column,
            kind: filter.kind,
            value,
        });
    }

    let clause = predicates
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{} {} :{}", quote_identifier(&p.column), p.kind.operator(), i + 1))
        .collect::<Vec<_>>()
        .join(" AND ");
    let binds = predicates.iter().map(|p| p.value.clone()).collect();

    Ok(Some(Restriction {
        clause,
        binds,
        predicates,
    }))
}

fn typed_value(property_type: PropertyType, raw: &str) -> Result<BindValue> {
    Ok(match property_type {
        PropertyType::Integer => BindValue::Integer(parse_integer(raw)?),
        PropertyType::Float | PropertyType::Decimal => BindValue::Float(parse_float(raw)?),
        PropertyType::Datetime | PropertyType::Date => BindValue::Timestamp(parse_datetime(raw)?),
        PropertyType::Bool => BindValue::Boolean(parse_bool(raw)?),
        _ => BindValue::Text(raw.to_string()),
    })
}
