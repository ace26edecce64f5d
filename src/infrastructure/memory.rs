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

//! In-memory implementation of the database port, used by the tests.
//!
//! It holds a small fixed catalog under the `C##NAVEEGO` schema, evaluates
//! restrictions from their structured predicates and counts every call that
//! reaches it, so tests can check that nothing touched the database.

use crate::config::Settings;
use crate::domain::entities::FilterKind;
use crate::domain::errors::{ConnectorError, Result};
use crate::domain::mapping::{
    widen_binary_float, BindValue, DaySecondInterval, NativeType, NativeValue,
};
use crate::domain::sql::{ObjectRef, RowSource, SelectStatement};
use crate::ports::database_port::{ColumnDescriptor, Connector, DatabaseSession, RowCursor};
use chrono::{FixedOffset, NaiveDate, NaiveDateTime};
use serde_json::json;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const OWNER: &str = "C##NAVEEGO";

pub fn test_settings() -> Settings {
    Settings {
        hostname: "localhost".to_string(),
        service_name: "ORCLPDB1".to_string(),
        username: OWNER.to_string(),
        password: Some("naveego".to_string()),
        ..Default::default()
    }
}

pub fn settings_json(username: &str) -> String {
    json!({
        "hostname": "localhost",
        "serviceName": "ORCLPDB1",
        "username": username,
        "password": "naveego",
    })
    .to_string()
}

struct Table {
    object: ObjectRef,
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Vec<NativeValue>>,
    statistics: Option<u64>,
}

/// An ad hoc query the catalog understands: a renaming projection of one table.
struct StoredQuery {
    text: String,
    table: ObjectRef,
    /// (source column, output column)
    projection: Vec<(String, String)>,
}

struct Procedure {
    object: ObjectRef,
    parameters: Vec<ColumnDescriptor>,
}

#[derive(Default)]
struct Catalog {
    tables: Vec<Table>,
    queries: Vec<StoredQuery>,
    procedures: Vec<Procedure>,
    calls: Vec<(ObjectRef, Vec<BindValue>)>,
    executed: Vec<String>,
}

#[derive(Clone)]
pub struct MemoryConnector {
    catalog: Arc<Mutex<Catalog>>,
    native_calls: Arc<AtomicUsize>,
    rows_fetched: Arc<AtomicUsize>,
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self {
            catalog: Arc::new(Mutex::new(seed())),
            native_calls: Arc::new(AtomicUsize::new(0)),
            rows_fetched: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Calls that reached the database, including opening sessions.
    pub fn native_calls(&self) -> usize {
        self.native_calls.load(AtomicOrdering::SeqCst)
    }

    pub fn rows_fetched(&self) -> usize {
        self.rows_fetched.load(AtomicOrdering::SeqCst)
    }

    pub fn executed(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    /// Successful procedure calls, in order.
    pub fn procedure_calls(&self) -> Vec<(ObjectRef, Vec<BindValue>)> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Catalog> {
        self.catalog.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Connector for MemoryConnector {
    fn open(&self, settings: &Settings) -> Result<Box<dyn DatabaseSession>> {
        self.native_calls.fetch_add(1, AtomicOrdering::SeqCst);
        if !settings.username.eq_ignore_ascii_case(OWNER) {
            return Err(ConnectorError::Connection(
                "ORA-01017: invalid username/password; logon denied".to_string(),
            ));
        }
        Ok(Box::new(MemorySession {
            connector: self.clone(),
            default_owner: settings.username.to_uppercase(),
        }))
    }
}

struct MemorySession {
    connector: MemoryConnector,
    default_owner: String,
}

struct MemoryCursor {
    columns: Vec<ColumnDescriptor>,
    rows: std::vec::IntoIter<Vec<NativeValue>>,
    fetched: Arc<AtomicUsize>,
}

impl Iterator for MemoryCursor {
    type Item = Result<Vec<NativeValue>>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        self.fetched.fetch_add(1, AtomicOrdering::SeqCst);
        Some(Ok(row))
    }
}

impl RowCursor for MemoryCursor {
    fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }
}

impl MemorySession {
    fn catalog(&self) -> MutexGuard<'_, Catalog> {
        self.connector.native_calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.connector.lock()
    }

    fn qualify(&self, object: &ObjectRef) -> ObjectRef {
        ObjectRef {
            owner: Some(object.owner.clone().unwrap_or_else(|| self.default_owner.clone())),
            name: object.name.clone(),
        }
    }

    fn source_rows(
        &self,
        catalog: &Catalog,
        source: &RowSource,
    ) -> Result<(Vec<ColumnDescriptor>, Vec<Vec<NativeValue>>)> {
        match source {
            RowSource::Object(object) => {
                let table = find_table(catalog, &self.qualify(object))?;
                Ok((table.columns.clone(), table.rows.clone()))
            }
            RowSource::Query(text) => {
                let stored = catalog
                    .queries
                    .iter()
                    .find(|q| normalize(&q.text) == normalize(text))
                    .ok_or_else(|| {
                        ConnectorError::Database("ORA-00900: invalid SQL statement".to_string())
                    })?;
                let table = find_table(catalog, &stored.table)?;

                let mut indices = Vec::with_capacity(stored.projection.len());
                let mut columns = Vec::with_capacity(stored.projection.len());
                for (source_column, output) in &stored.projection {
                    let index = column_index(&table.columns, source_column)?;
                    let mut column = table.columns[index].clone();
                    column.name = output.clone();
                    indices.push(index);
                    columns.push(column);
                }
                let rows = table
                    .rows
                    .iter()
                    .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                    .collect();
                Ok((columns, rows))
            }
        }
    }

    fn select(
        &self,
        statement: &SelectStatement,
    ) -> Result<(Vec<ColumnDescriptor>, Vec<Vec<NativeValue>>)> {
        let catalog = self.catalog();
        let (columns, rows) = self.source_rows(&catalog, &statement.source)?;

        let selected: Vec<usize> = if statement.columns.is_empty() {
            (0..columns.len()).collect()
        } else {
            statement
                .columns
                .iter()
                .map(|name| column_index(&columns, name))
                .collect::<Result<_>>()?
        };

        let mut predicates = Vec::new();
        if let Some(restriction) = &statement.restriction {
            for predicate in &restriction.predicates {
                predicates.push((column_index(&columns, &predicate.column)?, predicate));
            }
        }

        let limit = statement.limit.map_or(usize::MAX, |l| l as usize);
        let rows = rows
            .into_iter()
            .filter(|row| {
                predicates
                    .iter()
                    .all(|(i, p)| satisfies(&row[*i], p.kind, &p.value))
            })
            .take(limit)
            .map(|row| selected.iter().map(|&i| row[i].clone()).collect())
            .collect();
        let columns = selected.iter().map(|&i| columns[i].clone()).collect();
        Ok((columns, rows))
    }
}

impl DatabaseSession for MemorySession {
    fn list_objects(&mut self) -> Result<Vec<ObjectRef>> {
        Ok(self.catalog().tables.iter().map(|t| t.object.clone()).collect())
    }

    fn object_exists(&mut self, object: &ObjectRef) -> Result<bool> {
        let object = self.qualify(object);
        Ok(self.catalog().tables.iter().any(|t| t.object == object))
    }

    fn describe(&mut self, source: &RowSource) -> Result<Vec<ColumnDescriptor>> {
        let catalog = self.catalog();
        Ok(self.source_rows(&catalog, source)?.0)
    }

    fn query<'a>(&'a mut self, statement: &SelectStatement) -> Result<Box<dyn RowCursor + 'a>> {
        let (columns, rows) = self.select(statement)?;
        Ok(Box::new(MemoryCursor {
            columns,
            rows: rows.into_iter(),
            fetched: self.connector.rows_fetched.clone(),
        }))
    }

    fn count(&mut self, statement: &SelectStatement) -> Result<u64> {
        Ok(self.select(statement)?.1.len() as u64)
    }

    fn estimate_count(&mut self, object: &ObjectRef) -> Result<Option<u64>> {
        let object = self.qualify(object);
        let catalog = self.catalog();
        Ok(find_table(&catalog, &object)?.statistics)
    }

    fn list_procedures(&mut self) -> Result<Vec<ObjectRef>> {
        Ok(self.catalog().procedures.iter().map(|p| p.object.clone()).collect())
    }

    fn describe_procedure(
        &mut self,
        procedure: &ObjectRef,
    ) -> Result<Option<Vec<ColumnDescriptor>>> {
        let procedure = self.qualify(procedure);
        Ok(self
            .catalog()
            .procedures
            .iter()
            .find(|p| p.object == procedure)
            .map(|p| p.parameters.clone()))
    }

    fn call_procedure(&mut self, procedure: &ObjectRef, arguments: &[BindValue]) -> Result<()> {
        let procedure = self.qualify(procedure);
        let mut catalog = self.catalog();
        let expected = catalog
            .procedures
            .iter()
            .find(|p| p.object == procedure)
            .map(|p| p.parameters.len())
            .ok_or_else(|| {
                ConnectorError::Database(format!(
                    "PLS-00201: identifier '{}' must be declared",
                    procedure.display_name()
                ))
            })?;
        if expected != arguments.len() {
            return Err(ConnectorError::Database(format!(
                "PLS-00306: wrong number or types of arguments in call to '{}'",
                procedure.name
            )));
        }
        catalog.calls.push((procedure, arguments.to_vec()));
        Ok(())
    }

    /// Understands `INSERT INTO <table> VALUES ('<text>')` and nothing else.
    fn execute(&mut self, sql: &str) -> Result<()> {
        let mut catalog = self.catalog();
        catalog.executed.push(sql.to_string());

        let invalid = || ConnectorError::Database(format!("ORA-00900: invalid SQL statement: {}", sql));
        let original = sql.trim();
        let upper = original.to_ascii_uppercase();
        let prefix = "INSERT INTO ";
        let marker = " VALUES ('";

        let rest = upper.strip_prefix(prefix).ok_or_else(invalid)?;
        let values_at = rest.find(marker).ok_or_else(invalid)?;
        let target = ObjectRef::parse(&original[prefix.len()..prefix.len() + values_at])
            .map_err(|_| invalid())?;
        let text = original[prefix.len() + values_at + marker.len()..]
            .strip_suffix("')")
            .ok_or_else(invalid)?;

        let target = self.qualify(&target);
        let table = catalog
            .tables
            .iter_mut()
            .find(|t| t.object == target)
            .ok_or_else(table_missing)?;
        table.rows.push(vec![NativeValue::Text(text.to_string())]);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.connector.native_calls.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(())
    }
}

fn table_missing() -> ConnectorError {
    ConnectorError::Database("ORA-00942: table or view does not exist".to_string())
}

fn find_table<'c>(catalog: &'c Catalog, object: &ObjectRef) -> Result<&'c Table> {
    catalog
        .tables
        .iter()
        .find(|t| &t.object == object)
        .ok_or_else(table_missing)
}

fn column_index(columns: &[ColumnDescriptor], name: &str) -> Result<usize> {
    columns
        .iter()
        .position(|c| c.name == name)
        .ok_or_else(|| ConnectorError::Database(format!("ORA-00904: \"{}\": invalid identifier", name)))
}

fn normalize(sql: &str) -> String {
    sql.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

fn satisfies(value: &NativeValue, kind: FilterKind, bind: &BindValue) -> bool {
    matches!(
        (kind, compare(value, bind)),
        (FilterKind::Equals, Some(Ordering::Equal))
            | (FilterKind::GreaterThan, Some(Ordering::Greater))
            | (FilterKind::LessThan, Some(Ordering::Less))
    )
}

fn compare(value: &NativeValue, bind: &BindValue) -> Option<Ordering> {
    match (value, bind) {
        (NativeValue::Text(a), BindValue::Text(b)) => Some(a.as_str().cmp(b.as_str())),
        (NativeValue::Boolean(a), BindValue::Boolean(b)) => Some(a.cmp(b)),
        (NativeValue::Timestamp { value, offset }, BindValue::Timestamp(b)) => {
            let offset_seconds = offset.map_or(0, |o| o.local_minus_utc());
            let utc = *value - chrono::Duration::seconds(i64::from(offset_seconds));
            utc.partial_cmp(&b.naive_utc())
        }
        (value, BindValue::Integer(b)) => numeric(value)?.partial_cmp(&(*b as f64)),
        (value, BindValue::Float(b)) => numeric(value)?.partial_cmp(b),
        _ => None,
    }
}

fn numeric(value: &NativeValue) -> Option<f64> {
    match value {
        NativeValue::Number(s) => s.parse().ok(),
        NativeValue::BinaryFloat(f) => Some(widen_binary_float(*f)),
        NativeValue::BinaryDouble(d) => Some(*d),
        _ => None,
    }
}

// --- FIXTURES ---

fn object(name: &str) -> ObjectRef {
    ObjectRef::new(OWNER, name)
}

fn column(name: &str, native_type: NativeType, nullable: bool) -> ColumnDescriptor {
    ColumnDescriptor::new(name, native_type, nullable)
}

fn text(s: &str) -> NativeValue {
    NativeValue::Text(s.to_string())
}

fn naive(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32, nanos: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_nano_opt(h, mi, s, nanos))
        .unwrap_or_default()
}

fn timestamp_tz(y: i32, m: u32, d: u32, offset_hours: i32) -> NativeValue {
    NativeValue::Timestamp {
        value: naive(y, m, d, 0, 0, 0, 0),
        offset: FixedOffset::east_opt(offset_hours * 3600),
    }
}

fn seed() -> Catalog {
    let mut catalog = Catalog::default();

    let agents = [
        ("A007", "Ramasundar", "Bangalore", 0.15, "077-25814763", timestamp_tz(2019, 3, 1, 0), text("Joined the Bangalore office")),
        ("A003", "Alex", "London", 0.13, "075-12458969", timestamp_tz(1969, 1, 2, -5), NativeValue::Null),
        ("A008", "Alford", "New York", 0.12, "044-25874365", timestamp_tz(2019, 4, 12, -4), NativeValue::Null),
        ("A011", "Ravi Kumar", "Bangalore", 0.15, "077-45625874", timestamp_tz(2019, 5, 20, 5), text("Top seller")),
        ("A010", "Santakumar", "Chennai", 0.14, "007-22388644", timestamp_tz(1968, 7, 4, 0), NativeValue::Null),
        ("A012", "Lucida", "San Jose", 0.12, "044-52981425", timestamp_tz(2019, 6, 30, -7), NativeValue::Null),
        ("A005", "Anderson", "Brisban", 0.13, "045-21447739", timestamp_tz(1965, 2, 14, 10), NativeValue::Null),
        ("A001", "Subbarao", "Bangalore", 0.14, "077-12346674", timestamp_tz(2019, 8, 8, 5), NativeValue::Null),
        ("A002", "Mukesh", "Mumbai", 0.11, "029-12358964", timestamp_tz(1970, 1, 1, 0), NativeValue::Null),
        ("A006", "McDen", "London", 0.15, "078-22255588", timestamp_tz(2019, 10, 31, 0), NativeValue::Null),
        ("A004", "Ivan", "Torento", 0.15, "008-22544166", timestamp_tz(1960, 12, 25, -5), NativeValue::Null),
        ("A009", "Benjamin", "Hampshair", 0.11, "008-22536178", timestamp_tz(2019, 12, 1, 0), NativeValue::Null),
    ];
    catalog.tables.push(Table {
        object: object("AGENTS"),
        columns: vec![
            column("AGENT_CODE", NativeType::Char(4), false),
            column("AGENT_NAME", NativeType::Varchar2(40), true),
            column("WORKING_AREA", NativeType::Varchar2(35), true),
            column("COMMISSION", NativeType::BinaryFloat, true),
            column("PHONE_NO", NativeType::Varchar2(15), true),
            column("UPDATED_AT", NativeType::TimestampTz(6), true),
            column("BIOGRAPHY", NativeType::Varchar2(2056), true),
        ],
        rows: agents
            .into_iter()
            .map(|(code, name, area, commission, phone, updated_at, biography)| {
                vec![
                    text(code),
                    text(name),
                    text(area),
                    NativeValue::BinaryFloat(commission),
                    text(phone),
                    updated_at,
                    biography,
                ]
            })
            .collect(),
        statistics: Some(10),
    });

    catalog.tables.push(Table {
        object: object("CUSTOMERS"),
        columns: vec![
            column("CUST_CODE", NativeType::Varchar2(6), false),
            column("CUST_NAME", NativeType::Varchar2(40), false),
            column("AGENT_CODE", NativeType::Char(4), true),
        ],
        rows: vec![
            vec![text("C00013"), text("Holmes"), text("A003")],
            vec![text("C00001"), text("Micheal"), text("A008")],
        ],
        statistics: None,
    });

    catalog.tables.push(Table {
        object: object("ORDERS"),
        columns: vec![
            column("ORD_NUM", NativeType::Number { precision: 6, scale: 0 }, false),
            column("ORD_AMOUNT", NativeType::Number { precision: 12, scale: 2 }, false),
            column("AGENT_CODE", NativeType::Char(4), true),
        ],
        rows: vec![
            vec![NativeValue::Number("200100".into()), NativeValue::Number("1000.00".into()), text("A003")],
            vec![NativeValue::Number("200110".into()), NativeValue::Number("3000.00".into()), text("A010")],
        ],
        statistics: None,
    });

    catalog.tables.push(Table {
        object: object("PREPOST"),
        columns: vec![column("MESSAGE", NativeType::Varchar2(50), true)],
        rows: vec![vec![text("placeholder")]],
        statistics: None,
    });

    catalog.tables.push(Table {
        object: object("TYPES"),
        columns: vec![
            column("number", NativeType::unconstrained_number(), false),
            column("float", NativeType::BinaryFloat, true),
            column("double", NativeType::BinaryDouble, true),
            column("date", NativeType::Date, true),
            column("timestamp", NativeType::Timestamp(6), true),
            column("timestampWithTimeZone", NativeType::TimestampTz(6), true),
            column("intervalYear4ToMonth", NativeType::IntervalYearToMonth(2), true),
            column("intervalDay4ToSecond2", NativeType::IntervalDayToSecond(4, 2), true),
            column("char", NativeType::Char(6), true),
            column("varchar2", NativeType::Varchar2(10), true),
            column("nvarchar2", NativeType::NVarchar2(10), true),
            column("nchar", NativeType::NChar(6), true),
            column("xml", NativeType::Xml, true),
            column("blob", NativeType::Blob, true),
            column("clob", NativeType::Clob, true),
            column("nclob", NativeType::NClob, true),
        ],
        rows: vec![vec![
            NativeValue::Number("42".into()),
            NativeValue::BinaryFloat(123456.789),
            NativeValue::BinaryDouble(123456.789),
            NativeValue::Timestamp {
                value: naive(1998, 12, 25, 0, 0, 0, 0),
                offset: None,
            },
            NativeValue::Timestamp {
                value: naive(1997, 1, 31, 9, 26, 56, 660_000_000),
                offset: None,
            },
            NativeValue::Timestamp {
                value: naive(1997, 1, 31, 9, 26, 56, 660_000_000),
                offset: FixedOffset::east_opt(2 * 3600),
            },
            NativeValue::IntervalYearToMonth { years: 2, months: 4 },
            NativeValue::IntervalDayToSecond(DaySecondInterval {
                days: 120,
                hours: 6,
                minutes: 31,
                seconds: 14,
                nanoseconds: 0,
            }),
            text("char  "),
            text("varchar2"),
            text("nvarchar2"),
            text("nchar "),
            text("<data>42</data>\n"),
            NativeValue::Bytes(b"blob data".to_vec()),
            text("clob"),
            text("nclobdata"),
        ]],
        statistics: Some(1),
    });

    catalog.queries.push(StoredQuery {
        text: "SELECT AGENT_CODE, AGENT_NAME AS Name FROM Agents".to_string(),
        table: object("AGENTS"),
        projection: vec![
            ("AGENT_CODE".to_string(), "AGENT_CODE".to_string()),
            ("AGENT_NAME".to_string(), "NAME".to_string()),
        ],
    });

    let varchar2 = || NativeType::from_catalog("VARCHAR2", None, None, None);
    catalog.procedures.push(Procedure {
        object: object("TEST"),
        parameters: vec![
            column("I_AGENTID", varchar2(), true).with_source_type("VARCHAR2"),
            column("I_NAME", varchar2(), true).with_source_type("VARCHAR2"),
            column("I_COMMISSION", NativeType::unconstrained_number(), true)
                .with_source_type("NUMBER"),
        ],
    });

    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filters::{Predicate, Restriction};

    #[test]
    fn test_select_applies_predicates_and_limit() {
        let connector = MemoryConnector::new();
        let mut session = connector.open(&test_settings()).unwrap();

        let statement = SelectStatement::new(RowSource::Object(object("AGENTS")))
            .with_columns(vec!["AGENT_CODE".to_string()])
            .with_restriction(Some(Restriction {
                clause: "\"WORKING_AREA\" = :1".to_string(),
                binds: vec![BindValue::Text("London".to_string())],
                predicates: vec![Predicate {
                    column: "WORKING_AREA".to_string(),
                    kind: FilterKind::Equals,
                    value: BindValue::Text("London".to_string()),
                }],
            }));
        assert_eq!(session.count(&statement).unwrap(), 2);
        assert_eq!(session.count(&statement.clone().with_limit(Some(1))).unwrap(), 1);

        let cursor = session.query(&statement).unwrap();
        assert_eq!(cursor.columns().len(), 1);
    }

    #[test]
    fn test_execute_rejects_unknown_statements() {
        let mut session = MemoryConnector::new().open(&test_settings()).unwrap();
        session
            .execute("INSERT INTO C##NAVEEGO.PREPOST VALUES ('pre')")
            .unwrap();
        let err = session
            .execute("INSERT INTO C##NAVEEGO.PREPOST 'invalid syntax'")
            .unwrap_err();
        assert!(err.to_string().contains("invalid"));
    }
}
