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

//! Schema discovery: turns tables, views and queries into shapes.
//!
//! A failure while resolving one shape is recorded on that shape's `errors`
//! and never affects its siblings. Only a failure to list the catalog itself
//! fails the whole call.

use crate::application::streamer::encode_record;
use crate::config::Settings;
use crate::domain::entities::{
    Count, DiscoverMode, DiscoverShapesRequest, DiscoverShapesResponse, Property, Record, Shape,
};
use crate::domain::errors::{ConnectorError, Result};
use crate::domain::mapping::{map_native_type, NativeType};
use crate::domain::sql::{parse_identifier, quote_identifier, RowSource, SelectStatement};
use crate::ports::database_port::{ColumnDescriptor, DatabaseSession};
use log::{debug, info, warn};
use std::collections::HashSet;

pub fn discover_shapes(
    db: &mut dyn DatabaseSession,
    settings: &Settings,
    request: &DiscoverShapesRequest,
) -> Result<DiscoverShapesResponse> {
    let shapes = match request.mode {
        DiscoverMode::All => discover_all(db, settings, request.sample_size)?,
        DiscoverMode::Refresh => refresh(db, settings, &request.to_refresh, request.sample_size),
    };
    info!(
        "Discovered {} shapes ({} with errors)",
        shapes.len(),
        shapes.iter().filter(|s| !s.errors.is_empty()).count()
    );
    Ok(DiscoverShapesResponse { shapes })
}

fn discover_all(
    db: &mut dyn DatabaseSession,
    settings: &Settings,
    sample_size: u32,
) -> Result<Vec<Shape>> {
    let objects = db.list_objects()?;
    debug!("Catalog lists {} tables and views", objects.len());

    let mut shapes = Vec::with_capacity(objects.len());
    for object in objects {
        let mut shape = Shape::new(object.qualified(), object.display_name());
        let source = RowSource::Object(object);

        let resolved = if sample_size > 0 {
            resolve(db, settings, &mut shape, source, &[], sample_size)
        } else {
            describe_properties(db, &source, &[]).map(|p| shape.properties = p)
        };
        if let Err(e) = resolved {
            warn!("Shape {} failed: {}", shape.id, e);
            shape.errors.push(e.to_string());
        }
        shapes.push(shape);
    }
    Ok(shapes)
}

fn refresh(
    db: &mut dyn DatabaseSession,
    settings: &Settings,
    requested: &[Shape],
    sample_size: u32,
) -> Vec<Shape> {
    let mut seen = HashSet::new();
    let mut shapes = Vec::with_capacity(requested.len());

    for original in requested {
        if !seen.insert(original.id.clone()) {
            debug!("Skipping duplicate refresh of {}", original.id);
            continue;
        }

        let mut shape = Shape {
            id: original.id.clone(),
            name: if original.name.is_empty() {
                original.id.clone()
            } else {
                original.name.clone()
            },
            query: original.query.clone(),
            ..Default::default()
        };

        let resolved = RowSource::for_shape(original)
            .and_then(|source| resolve(db, settings, &mut shape, source, &original.properties, sample_size));
        if let Err(e) = resolved {
            warn!("Shape {} failed: {}", shape.id, e);
            shape.errors.push(e.to_string());
        }
        shapes.push(shape);
    }
    shapes
}

/// Fills in properties, sample and count for one shape.
fn resolve(
    db: &mut dyn DatabaseSession,
    settings: &Settings,
    shape: &mut Shape,
    source: RowSource,
    known: &[Property],
    sample_size: u32,
) -> Result<()> {
    if let RowSource::Object(object) = &source {
        if !db.object_exists(object)? {
            return Err(ConnectorError::Discovery(format!(
                "{} does not exist",
                object.display_name()
            )));
        }
    }

    shape.properties = describe_properties(db, &source, known)?;

    if sample_size > 0 {
        match sample(db, &source, &shape.properties, sample_size) {
            Ok(records) => shape.sample = records,
            Err(e) => shape.errors.push(format!("sample failed: {}", e)),
        }
    }

    match count_rows(db, settings, &source) {
        Ok(count) => shape.count = Some(count),
        Err(e) => shape.errors.push(format!("count failed: {}", e)),
    }
    Ok(())
}

/// Describes a row source, keeping `isKey` from caller-supplied properties.
pub fn describe_properties(
    db: &mut dyn DatabaseSession,
    source: &RowSource,
    known: &[Property],
) -> Result<Vec<Property>> {
    let columns = db.describe(source)?;
    Ok(columns
        .iter()
        .map(|column| {
            let mut property = property_for_column(column, quote_identifier(&column.name));
            property.is_key = known
                .iter()
                .find(|k| k.id == property.id)
                .is_some_and(|k| k.is_key);
            property
        })
        .collect())
}

pub fn property_for_column(column: &ColumnDescriptor, id: String) -> Property {
    Property {
        id,
        name: column.name.clone(),
        property_type: map_native_type(&column.native_type),
        type_at_source: column.source_type.clone(),
        is_nullable: column.nullable,
        is_key: false,
    }
}

fn sample(
    db: &mut dyn DatabaseSession,
    source: &RowSource,
    properties: &[Property],
    sample_size: u32,
) -> Result<Vec<Record>> {
    let columns = properties
        .iter()
        .map(|p| parse_identifier(&p.id))
        .collect::<Result<Vec<_>>>()?;
    let statement = SelectStatement::new(source.clone())
        .with_columns(columns)
        .with_limit(Some(u64::from(sample_size)));

    let cursor = db.query(&statement)?;
    let native_types: Vec<NativeType> =
        cursor.columns().iter().map(|c| c.native_type.clone()).collect();

    let mut records = Vec::new();
    for row in cursor {
        records.push(encode_record(properties, &native_types, row?)?);
    }
    Ok(records)
}

fn count_rows(db: &mut dyn DatabaseSession, settings: &Settings, source: &RowSource) -> Result<Count> {
    if settings.estimate_counts {
        if let RowSource::Object(object) = source {
            if let Some(estimate) = db.estimate_count(object)? {
                return Ok(Count::estimate(estimate));
            }
        }
    }
    let value = db.count(&SelectStatement::new(source.clone()))?;
    Ok(Count::exact(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{CountKind, PropertyType};
    use crate::infrastructure::memory::{test_settings, MemoryConnector};
    use crate::ports::database_port::Connector;

    fn request(mode: DiscoverMode, to_refresh: Vec<Shape>, sample_size: u32) -> DiscoverShapesRequest {
        DiscoverShapesRequest {
            mode,
            to_refresh,
            sample_size,
        }
    }

    #[test]
    fn test_all_mode_stubs_without_sample() {
        let settings = test_settings();
        let mut db = MemoryConnector::new().open(&settings).unwrap();
        let response =
            discover_shapes(db.as_mut(), &settings, &request(DiscoverMode::All, vec![], 0)).unwrap();

        let agents = response
            .shapes
            .iter()
            .find(|s| s.id == "\"C##NAVEEGO\".\"AGENTS\"")
            .unwrap();
        assert_eq!(agents.name, "C##NAVEEGO.AGENTS");
        assert!(!agents.properties.is_empty());
        assert!(agents.sample.is_empty());
        assert!(agents.count.is_none());
    }

    #[test]
    fn test_refresh_keeps_caller_keys_and_dedupes() {
        let settings = test_settings();
        let mut db = MemoryConnector::new().open(&settings).unwrap();

        let mut agents = Shape::new("\"C##NAVEEGO\".\"AGENTS\"", "Agents");
        agents.properties.push(Property {
            id: "\"AGENT_CODE\"".to_string(),
            is_key: true,
            ..Default::default()
        });
        let response = discover_shapes(
            db.as_mut(),
            &settings,
            &request(DiscoverMode::Refresh, vec![agents.clone(), agents], 1),
        )
        .unwrap();

        assert_eq!(response.shapes.len(), 1);
        let shape = &response.shapes[0];
        assert_eq!(shape.name, "Agents");
        assert!(shape.property("\"AGENT_CODE\"").unwrap().is_key);
        assert!(!shape.property("\"AGENT_NAME\"").unwrap().is_key);
        assert_eq!(shape.sample.len(), 1);
    }

    #[test]
    fn test_refresh_ids_are_unique() {
        let settings = test_settings();
        let mut db = MemoryConnector::new().open(&settings).unwrap();
        let shapes = vec![
            Shape::new("q", "First").with_query("SELECT AGENT_CODE, AGENT_NAME AS Name FROM Agents"),
            Shape::new("q", "Second")
                .with_query("SELECT AGENT_CODE,  AGENT_NAME AS Name FROM Agents"),
        ];
        let response =
            discover_shapes(db.as_mut(), &settings, &request(DiscoverMode::Refresh, shapes, 0))
                .unwrap();

        assert_eq!(response.shapes.len(), 1);
        assert_eq!(response.shapes[0].name, "First");
    }

    #[test]
    fn test_huge_sample_size_only_returns_existing_rows() {
        let settings = test_settings();
        let mut db = MemoryConnector::new().open(&settings).unwrap();
        let response = discover_shapes(
            db.as_mut(),
            &settings,
            &request(
                DiscoverMode::Refresh,
                vec![Shape::new("\"C##NAVEEGO\".\"AGENTS\"", "Agents")],
                u32::MAX,
            ),
        )
        .unwrap();

        let shape = &response.shapes[0];
        assert!(shape.errors.is_empty());
        assert_eq!(shape.sample.len(), 12);
    }

    #[test]
    fn test_refresh_errors_stay_on_their_shape() {
        let settings = test_settings();
        let mut db = MemoryConnector::new().open(&settings).unwrap();
        let response = discover_shapes(
            db.as_mut(),
            &settings,
            &request(
                DiscoverMode::Refresh,
                vec![
                    Shape::new("\"C##NAVEEGO\".\"MISSING\"", "Missing"),
                    Shape::new("not a name", "Bad"),
                    Shape::new("\"C##NAVEEGO\".\"ORDERS\"", "Orders"),
                ],
                0,
            ),
        )
        .unwrap();

        assert_eq!(response.shapes.len(), 3);
        assert_eq!(response.shapes[0].errors.len(), 1);
        assert!(response.shapes[0].errors[0].contains("does not exist"));
        assert_eq!(response.shapes[1].errors.len(), 1);
        assert!(response.shapes[2].errors.is_empty());
        assert_eq!(response.shapes[2].count.unwrap().kind, CountKind::Exact);
    }

    #[test]
    fn test_estimate_counts_are_opt_in() {
        let mut settings = test_settings();
        settings.estimate_counts = true;
        let mut db = MemoryConnector::new().open(&settings).unwrap();

        let shapes = vec![
            Shape::new("\"C##NAVEEGO\".\"AGENTS\"", "Agents"),
            Shape::new("agent_names", "Agent Names")
                .with_query("SELECT AGENT_CODE, AGENT_NAME AS Name FROM Agents"),
        ];
        let response =
            discover_shapes(db.as_mut(), &settings, &request(DiscoverMode::Refresh, shapes, 0))
                .unwrap();

        assert_eq!(response.shapes[0].count, Some(Count::estimate(10)));
        assert_eq!(response.shapes[1].count, Some(Count::exact(12)));
        assert_eq!(
            response.shapes[1].property("\"NAME\"").unwrap().property_type,
            PropertyType::String
        );
    }
}
