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

//! Utility functions for generating Oracle SQL.
//!
//! This module knows how to name things in Oracle (quoted and unquoted
//! identifiers, schema-qualified objects) and how to assemble the `SELECT`
//! statements used for describing, sampling, counting and streaming a shape.
//! Values never appear in the generated text; they travel as bind values.

use crate::domain::entities::Shape;
use crate::domain::errors::{ConnectorError, Result};
use crate::domain::filters::Restriction;
use crate::domain::mapping::BindValue;
use std::fmt;

/// Wraps an identifier in double quotes, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Parses one identifier the way Oracle does.
///
/// Quoted identifiers are taken verbatim; unquoted ones are upper-cased and
/// must only contain letters, digits, `_`, `$` and `#`.
pub fn parse_identifier(text: &str) -> Result<String> {
    let parts = split_qualified(text)?;
    match parts.as_slice() {
        [single] => Ok(single.clone()),
        _ => Err(ConnectorError::Discovery(format!(
            "'{}' is not a single identifier",
            text
        ))),
    }
}

/// Splits `OWNER.NAME` / `"Owner"."Name"` into normalized parts.
fn split_qualified(text: &str) -> Result<Vec<String>> {
    let invalid = || ConnectorError::Discovery(format!("'{}' is not a valid Oracle name", text));
    let mut parts = Vec::new();
    let mut chars = text.trim().chars().peekable();

    loop {
        let mut part = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            loop {
                match chars.next() {
                    Some('"') if chars.peek() == Some(&'"') => {
                        chars.next();
                        part.push('"');
                    }
                    Some('"') => break,
                    Some(c) => part.push(c),
                    None => return Err(invalid()),
                }
            }
            if part.is_empty() {
                return Err(invalid());
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c == '.' {
                    break;
                }
                part.push(c);
                chars.next();
            }
            let valid = part.chars().next().is_some_and(|c| c.is_alphabetic())
                && part
                    .chars()
                    .all(|c| c.is_alphanumeric() || matches!(c, '_' | '$' | '#'));
            if !valid {
                return Err(invalid());
            }
            part = part.to_uppercase();
        }
        parts.push(part);

        match chars.next() {
            Some('.') => continue,
            None => break,
            Some(_) => return Err(invalid()),
        }
    }
    Ok(parts)
}

/// A schema object (table, view or procedure), optionally owner-qualified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub owner: Option<String>,
    pub name: String,
}

impl ObjectRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: Some(owner.into()),
            name: name.into(),
        }
    }

    /// Parses `"C##NAVEEGO"."AGENTS"`, `C##NAVEEGO.TEST` or `TEST`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut parts = split_qualified(text)?;
        match parts.len() {
            1 => Ok(Self {
                owner: None,
                name: parts.remove(0),
            }),
            2 => {
                let name = parts.remove(1);
                Ok(Self {
                    owner: Some(parts.remove(0)),
                    name,
                })
            }
            _ => Err(ConnectorError::Discovery(format!(
                "'{}' must be NAME or OWNER.NAME",
                text
            ))),
        }
    }

    /// The quoted, schema-qualified form used as a shape id.
    pub fn qualified(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{}.{}", quote_identifier(owner), quote_identifier(&self.name)),
            None => quote_identifier(&self.name),
        }
    }

    /// `OWNER.NAME` without quotes, for display.
    pub fn display_name(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{}.{}", owner, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified())
    }
}

/// Where a shape's rows come from.
#[derive(Debug, Clone, PartialEq)]
pub enum RowSource {
    Object(ObjectRef),
    Query(String),
}

impl RowSource {
    /// The explicit query wins; otherwise the shape id names a table or view.
    pub fn for_shape(shape: &Shape) -> Result<Self> {
        match shape.row_query() {
            Some(query) => Ok(RowSource::Query(query.trim_end_matches(';').trim().to_string())),
            None => ObjectRef::parse(&shape.id).map(RowSource::Object),
        }
    }

    pub fn from_clause(&self) -> String {
        match self {
            RowSource::Object(object) => object.qualified(),
            RowSource::Query(query) => format!("({}) src", query),
        }
    }
}

/// A `SELECT` over a row source, optionally restricted and limited.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub source: RowSource,
    /// Unquoted column names; empty selects `*`.
    pub columns: Vec<String>,
    pub restriction: Option<Restriction>,
    pub limit: Option<u64>,
}

impl SelectStatement {
    pub fn new(source: RowSource) -> Self {
        Self {
            source,
            columns: Vec::new(),
            restriction: None,
            limit: None,
        }
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_restriction(mut self, restriction: Option<Restriction>) -> Self {
        self.restriction = restriction;
        self
    }

    pub fn with_limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    pub fn to_sql(&self) -> String {
        let select_list = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns
                .iter()
                .map(|c| quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!("SELECT {} FROM {}", select_list, self.source.from_clause());
        if let Some(restriction) = &self.restriction {
            sql.push_str(" WHERE ");
            sql.push_str(&restriction.clause);
        }
        if let Some(limit) = self.limit {
            sql = format!("SELECT * FROM ({}) WHERE ROWNUM <= {}", sql, limit);
        }
        sql
    }

    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM ({})", self.to_sql())
    }

    /// Returns no rows but exposes the column metadata of the source.
    pub fn describe_sql(&self) -> String {
        format!("SELECT * FROM {} WHERE 1=0", self.source.from_clause())
    }

    pub fn binds(&self) -> &[BindValue] {
        self.restriction
            .as_ref()
            .map(|r| r.binds.as_slice())
            .unwrap_or(&[])
    }
}
