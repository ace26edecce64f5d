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

//! Streams a shape's rows to the caller as records.

use crate::application::discovery::describe_properties;
use crate::domain::entities::{Property, ReadRequest, Record};
use crate::domain::errors::{ConnectorError, Result};
use crate::domain::filters;
use crate::domain::mapping::{encode_value, NativeType, NativeValue};
use crate::domain::sql::{parse_identifier, RowSource, SelectStatement};
use crate::ports::database_port::DatabaseSession;
use crate::ports::stream_port::RecordSink;
use log::{debug, info};
use serde_json::{Map, Value};
use std::time::Instant;

/// Publishes every row matching the request's filters into `sink`.
///
/// Rows are fetched one at a time; the first failed `send` stops fetching and
/// is returned unchanged. Returns the number of records sent.
pub fn publish(
    db: &mut dyn DatabaseSession,
    request: &ReadRequest,
    sink: &mut dyn RecordSink,
) -> Result<u64> {
    let start_time = Instant::now();
    let source = RowSource::for_shape(&request.shape)?;

    let properties = if request.shape.properties.is_empty() {
        describe_properties(db, &source, &[])?
    } else {
        request.shape.properties.clone()
    };

    let restriction = filters::translate(&properties, &request.filters)?;
    let columns = properties
        .iter()
        .map(|p| parse_identifier(&p.id))
        .collect::<Result<Vec<_>>>()?;
    let limit = (request.limit > 0).then_some(u64::from(request.limit));

    let statement = SelectStatement::new(source)
        .with_columns(columns)
        .with_restriction(restriction)
        .with_limit(limit);
    debug!("Publishing {} with: {}", request.shape.id, statement.to_sql());

    let cursor = db.query(&statement)?;
    let native_types: Vec<NativeType> =
        cursor.columns().iter().map(|c| c.native_type.clone()).collect();

    let mut count = 0;
    for row in cursor {
        let record = encode_record(&properties, &native_types, row?)?;
        sink.send(record)?;
        count += 1;
    }

    info!(
        "Published {} records from {} in {:.2}s",
        count,
        request.shape.id,
        start_time.elapsed().as_secs_f64()
    );
    Ok(count)
}

/// Encodes one row into a record keyed by property id.
pub fn encode_record(
    properties: &[Property],
    native_types: &[NativeType],
    row: Vec<NativeValue>,
) -> Result<Record> {
    if row.len() != properties.len() || native_types.len() != properties.len() {
        return Err(ConnectorError::Discovery(format!(
            "row has {} columns but the shape has {} properties",
            row.len(),
            properties.len()
        )));
    }

    let mut data = Map::with_capacity(properties.len());
    for ((property, native), value) in properties.iter().zip(native_types).zip(row) {
        data.insert(property.id.clone(), encode_value(native, &value));
    }

    Ok(Record {
        data_json: Value::Object(data).to_string(),
        correlation_id: String::new(),
    })
}
