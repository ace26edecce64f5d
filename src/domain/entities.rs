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

//! # Domain Entities
//!
//! Entities are the "Nouns" of the publisher protocol: Shapes, Properties,
//! Records and the request/response messages exchanged with the host. They are
//! plain data structures; the host owns their wire format, so the field names
//! below follow its camelCase JSON contract.
//!
//! We use the `serde` crate (Serialize/Deserialize) so every message can be
//! logged, stored, or pushed through the JSON-lines harness unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The abstract column types understood by the host.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyType {
    #[default]
    String,
    /// Long character data, shown by the host as a multi-line field.
    Text,
    Integer,
    Float,
    Decimal,
    Datetime,
    Date,
    Time,
    Bool,
    Json,
    Xml,
    Blob,
}

impl PropertyType {
    /// Character types encode NULL as an empty string instead of `null`.
    pub fn is_textual(self) -> bool {
        matches!(self, PropertyType::String | PropertyType::Text)
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyType::String => "STRING",
            PropertyType::Text => "TEXT",
            PropertyType::Integer => "INTEGER",
            PropertyType::Float => "FLOAT",
            PropertyType::Decimal => "DECIMAL",
            PropertyType::Datetime => "DATETIME",
            PropertyType::Date => "DATE",
            PropertyType::Time => "TIME",
            PropertyType::Bool => "BOOL",
            PropertyType::Json => "JSON",
            PropertyType::Xml => "XML",
            PropertyType::Blob => "BLOB",
        };
        write!(f, "{}", name)
    }
}

/// `Property` describes one column of a shape (or one parameter of a write-back procedure).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Property {
    /// Key used in every record's `dataJson` (e.g. `"AGENT_CODE"`, quotes included).
    pub id: String,
    /// Human readable column name (e.g. `AGENT_CODE`).
    pub name: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    /// What Oracle calls the type (e.g. `CHAR(4)`).
    pub type_at_source: String,
    pub is_nullable: bool,
    /// Oracle cannot report key-ness through a describe, so this stays false
    /// unless the caller supplied it.
    pub is_key: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CountKind {
    #[default]
    Exact,
    Estimate,
}

/// Row count of a shape's row source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Count {
    pub kind: CountKind,
    pub value: u64,
}

impl Count {
    pub fn exact(value: u64) -> Self {
        Self {
            kind: CountKind::Exact,
            value,
        }
    }

    pub fn estimate(value: u64) -> Self {
        Self {
            kind: CountKind::Estimate,
            value,
        }
    }
}

/// `Shape` is the blueprint for one publishable data source.
///
/// The row source is either the native object named by `id` or, when `query`
/// is set, the query text itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Shape {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub properties: Vec<Property>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sample: Vec<Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<Count>,
    /// Problems found while resolving this shape. Empty means healthy.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl Shape {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// The explicit query, ignoring blank strings sent by hosts that use `""` for "unset".
    pub fn row_query(&self) -> Option<&str> {
        self.query.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    pub fn property(&self, id: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.id == id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterKind {
    Equals,
    GreaterThan,
    LessThan,
}

/// A single predicate requested by the host for a publish.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublishFilter {
    pub kind: FilterKind,
    pub property_id: String,
    /// Always a string on the wire; typed later using the property's type.
    pub value: String,
}

/// One row, encoded as a flat JSON object keyed by property id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Record {
    pub data_json: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub correlation_id: String,
}

/// Acknowledgement for one written record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordAck {
    pub correlation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecordAck {
    pub fn success(correlation_id: String) -> Self {
        Self {
            correlation_id,
            error: None,
        }
    }

    pub fn failure(correlation_id: String, error: String) -> Self {
        Self {
            correlation_id,
            error: Some(error),
        }
    }
}

// --- REQUEST / RESPONSE MESSAGES ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    pub settings_json: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ConnectResponse {}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DisconnectRequest {}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DisconnectResponse {}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscoverMode {
    #[default]
    All,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoverShapesRequest {
    pub mode: DiscoverMode,
    pub to_refresh: Vec<Shape>,
    pub sample_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DiscoverShapesResponse {
    pub shapes: Vec<Shape>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadRequest {
    pub shape: Shape,
    pub filters: Vec<PublishFilter>,
    /// Maximum number of records to publish; 0 publishes everything.
    pub limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigurationFormRequest {
    pub data_json: String,
    pub state_json: String,
}

/// A JSON-schema form the host renders for the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigurationFormResponse {
    pub schema_json: String,
    pub ui_json: String,
    pub data_json: String,
    pub state_json: String,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ConfigureWriteRequest {
    pub form: Option<ConfigurationFormRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ConfigureWriteResponse {
    pub form: ConfigurationFormResponse,
    pub shape: Option<Shape>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PrepareWriteRequest {
    pub shape: Shape,
    pub commit_sla_seconds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PrepareWriteResponse {}
