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

//! Oracle implementation of the database port.
//!
//! A session owns an r2d2 pool capped at one connection. Each operation checks
//! the connection out, so a connection the pool finds broken is replaced on
//! the next call instead of failing the rest of the session.

use crate::config::Settings;
use crate::domain::errors::{ConnectorError, Result};
use crate::domain::mapping::{BindValue, NativeType, NativeValue};
use crate::domain::sql::{ObjectRef, RowSource, SelectStatement};
use crate::infrastructure::oracle::connection_manager::OracleConnectionManager;
use crate::infrastructure::oracle::conversions::{as_params, native_type, native_value, to_sql_values};
use crate::ports::database_port::{ColumnDescriptor, Connector, DatabaseSession, RowCursor};
use log::{debug, info};
use oracle::{ColumnInfo, ResultSet, Row};
use r2d2::{ManageConnection, Pool, PooledConnection};
use std::time::Duration;

const DEFAULT_CONNECT_TIMEOUT_SECONDS: u64 = 15;
const DEFAULT_PREFETCH_ROWS: u32 = 500;

// --- ORACLE DICTIONARY QUERIES ---
// `:1` is the owner; NULL means the session's current schema.

const SQL_LIST_OBJECTS: &str = "
    SELECT o.owner, o.object_name
    FROM all_objects o
    JOIN all_users u ON u.username = o.owner
    WHERE o.object_type IN ('TABLE', 'VIEW')
      AND u.oracle_maintained = 'N'
      AND o.object_name NOT LIKE 'BIN$%'
    ORDER BY o.owner, o.object_name";

const SQL_OBJECT_EXISTS: &str = "
    SELECT COUNT(*) FROM all_objects
    WHERE owner = NVL(:1, SYS_CONTEXT('USERENV', 'CURRENT_SCHEMA'))
      AND object_name = :2
      AND object_type IN ('TABLE', 'VIEW')";

const SQL_TABLE_STATISTICS: &str = "
    SELECT num_rows FROM all_tables
    WHERE owner = NVL(:1, SYS_CONTEXT('USERENV', 'CURRENT_SCHEMA'))
      AND table_name = :2";

const SQL_LIST_PROCEDURES: &str = "
    SELECT p.owner, p.object_name
    FROM all_procedures p
    JOIN all_users u ON u.username = p.owner
    WHERE p.object_type = 'PROCEDURE'
      AND u.oracle_maintained = 'N'
    ORDER BY p.owner, p.object_name";

const SQL_PROCEDURE_EXISTS: &str = "
    SELECT COUNT(*) FROM all_procedures
    WHERE owner = NVL(:1, SYS_CONTEXT('USERENV', 'CURRENT_SCHEMA'))
      AND object_name = :2
      AND object_type = 'PROCEDURE'";

const SQL_PROCEDURE_ARGUMENTS: &str = "
    SELECT argument_name, data_type, data_length, data_precision, data_scale
    FROM all_arguments
    WHERE owner = NVL(:1, SYS_CONTEXT('USERENV', 'CURRENT_SCHEMA'))
      AND object_name = :2
      AND package_name IS NULL
      AND argument_name IS NOT NULL
      AND in_out IN ('IN', 'IN/OUT')
    ORDER BY position";

/// Opens `OracleSession`s.
#[derive(Debug, Default, Clone, Copy)]
pub struct OracleConnector;

impl Connector for OracleConnector {
    fn open(&self, settings: &Settings) -> Result<Box<dyn DatabaseSession>> {
        let conn_str = settings.get_connection_string();
        let manager = OracleConnectionManager::new(
            &settings.username,
            &settings.resolved_password(),
            &conn_str,
        );
        let timeout = Duration::from_secs(
            settings
                .connect_timeout_seconds
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECONDS),
        );

        let pool = build_pool(manager, timeout);

        // Check a connection out once so bad credentials fail the connect call.
        pool.get()
            .map_err(|e| ConnectorError::Connection(e.to_string()))?;
        info!("Connected to {} as {}", conn_str, settings.username);

        Ok(Box::new(OracleSession {
            pool,
            prefetch_rows: settings.prefetch_rows.unwrap_or(DEFAULT_PREFETCH_ROWS),
        }))
    }
}

/// One lazily opened connection, reused by every call of the session.
///
/// Checkouts are not pinged: a write stream checks the connection out once
/// per record. A dead connection is caught by `has_broken` when it is returned.
fn build_pool<M: ManageConnection>(manager: M, timeout: Duration) -> Pool<M> {
    Pool::builder()
        .max_size(1)
        .min_idle(Some(0))
        .test_on_check_out(false)
        .connection_timeout(timeout)
        .build_unchecked(manager)
}

pub struct OracleSession {
    pool: Pool<OracleConnectionManager>,
    prefetch_rows: u32,
}

impl OracleSession {
    fn get_conn(&self) -> Result<PooledConnection<OracleConnectionManager>> {
        self.pool.get().map_err(|e| {
            ConnectorError::Connection(format!("Failed to get connection from pool: {}", e))
        })
    }

    /// Runs a single-row dictionary query keyed by (owner, name).
    fn lookup_count(&self, sql: &str, object: &ObjectRef) -> Result<u64> {
        let conn = self.get_conn()?;
        let row = conn.query_row(sql, &[&object.owner, &object.name])?;
        Ok(row.get::<usize, u64>(0)?)
    }
}

fn describe_column(info: &ColumnInfo) -> ColumnDescriptor {
    ColumnDescriptor::new(info.name(), native_type(info.oracle_type()), info.nullable())
}

/// Builds `BEGIN "OWNER"."PROC"(:1, :2); END;`.
fn call_sql(procedure: &ObjectRef, arity: usize) -> String {
    let placeholders = (1..=arity)
        .map(|i| format!(":{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    format!("BEGIN {}({}); END;", procedure.qualified(), placeholders)
}

impl DatabaseSession for OracleSession {
    fn list_objects(&mut self) -> Result<Vec<ObjectRef>> {
        let conn = self.get_conn()?;
        let rows = conn.query(SQL_LIST_OBJECTS, &[])?;
        let mut objects = Vec::new();
        for row_result in rows {
            let row = row_result?;
            objects.push(ObjectRef::new(
                row.get::<usize, String>(0)?,
                row.get::<usize, String>(1)?,
            ));
        }
        Ok(objects)
    }

    fn object_exists(&mut self, object: &ObjectRef) -> Result<bool> {
        Ok(self.lookup_count(SQL_OBJECT_EXISTS, object)? > 0)
    }

    fn describe(&mut self, source: &RowSource) -> Result<Vec<ColumnDescriptor>> {
        let sql = SelectStatement::new(source.clone()).describe_sql();
        debug!("Describing with: {}", sql);
        let conn = self.get_conn()?;
        let mut stmt = conn.statement(&sql).build()?;
        let rows = stmt.query(&[])?;
        let columns = rows.column_info().iter().map(describe_column).collect();
        Ok(columns)
    }

    fn query<'a>(&'a mut self, statement: &SelectStatement) -> Result<Box<dyn RowCursor + 'a>> {
        let sql = statement.to_sql();
        debug!("Querying with: {}", sql);
        let conn = self.get_conn()?;
        let values = to_sql_values(statement.binds());
        let stmt = conn
            .statement(&sql)
            .prefetch_rows(self.prefetch_rows)
            .build()?;
        let rows = stmt.into_result_set(&as_params(&values))?;
        let columns = rows.column_info().iter().map(describe_column).collect();

        Ok(Box::new(OracleCursor {
            rows,
            columns,
            _conn: conn,
        }))
    }

    fn count(&mut self, statement: &SelectStatement) -> Result<u64> {
        let conn = self.get_conn()?;
        let values = to_sql_values(statement.binds());
        let row = conn.query_row(&statement.count_sql(), &as_params(&values))?;
        Ok(row.get::<usize, u64>(0)?)
    }

    fn estimate_count(&mut self, object: &ObjectRef) -> Result<Option<u64>> {
        let conn = self.get_conn()?;
        let mut rows = conn.query(SQL_TABLE_STATISTICS, &[&object.owner, &object.name])?;
        match rows.next() {
            Some(row) => Ok(row?.get::<usize, Option<u64>>(0)?),
            None => Ok(None),
        }
    }

    fn list_procedures(&mut self) -> Result<Vec<ObjectRef>> {
        let conn = self.get_conn()?;
        let rows = conn.query(SQL_LIST_PROCEDURES, &[])?;
        let mut procedures = Vec::new();
        for row_result in rows {
            let row = row_result?;
            procedures.push(ObjectRef::new(
                row.get::<usize, String>(0)?,
                row.get::<usize, String>(1)?,
            ));
        }
        Ok(procedures)
    }

    fn describe_procedure(
        &mut self,
        procedure: &ObjectRef,
    ) -> Result<Option<Vec<ColumnDescriptor>>> {
        if self.lookup_count(SQL_PROCEDURE_EXISTS, procedure)? == 0 {
            return Ok(None);
        }

        let conn = self.get_conn()?;
        let rows = conn.query(
            SQL_PROCEDURE_ARGUMENTS,
            &[&procedure.owner, &procedure.name],
        )?;
        let mut parameters = Vec::new();
        for row_result in rows {
            let row = row_result?;
            let name = row.get::<usize, String>(0)?;
            let data_type = row.get::<usize, String>(1)?;
            let length = row.get::<usize, Option<u32>>(2)?;
            let precision = row.get::<usize, Option<u32>>(3)?;
            let scale = row.get::<usize, Option<i32>>(4)?;
            let native = NativeType::from_catalog(&data_type, length, precision, scale);
            parameters.push(ColumnDescriptor::new(name, native, true).with_source_type(data_type));
        }
        Ok(Some(parameters))
    }

    fn call_procedure(&mut self, procedure: &ObjectRef, arguments: &[BindValue]) -> Result<()> {
        let sql = call_sql(procedure, arguments.len());
        let conn = self.get_conn()?;
        let values = to_sql_values(arguments);
        conn.execute(&sql, &as_params(&values))?;
        Ok(())
    }

    fn execute(&mut self, sql: &str) -> Result<()> {
        debug!("Executing: {}", sql);
        let conn = self.get_conn()?;
        conn.execute(sql, &[])?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let state = self.pool.state();
        debug!(
            "Closing session ({} connection(s), {} idle)",
            state.connections, state.idle_connections
        );
        Ok(())
    }
}

/// Streams rows from an open result set.
///
/// Holds the checked-out connection until the cursor is dropped.
struct OracleCursor {
    rows: ResultSet<'static, Row>,
    columns: Vec<ColumnDescriptor>,
    _conn: PooledConnection<OracleConnectionManager>,
}

impl Iterator for OracleCursor {
    type Item = Result<Vec<NativeValue>>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = match self.rows.next()? {
            Ok(row) => row,
            Err(e) => return Some(Err(e.into())),
        };
        Some(
            self.columns
                .iter()
                .enumerate()
                .map(|(i, column)| native_value(&row, i, &column.native_type))
                .collect(),
        )
    }
}

impl RowCursor for OracleCursor {
    fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_call_sql() {
        assert_eq!(
            call_sql(&ObjectRef::new("C##NAVEEGO", "TEST"), 3),
            "BEGIN \"C##NAVEEGO\".\"TEST\"(:1, :2, :3); END;"
        );
        let bare = ObjectRef::parse("TEST").unwrap();
        assert_eq!(call_sql(&bare, 0), "BEGIN \"TEST\"(); END;");
    }

    #[derive(Default)]
    struct Counters {
        connects: AtomicUsize,
        validations: AtomicUsize,
    }

    struct CountingManager(Arc<Counters>);

    impl ManageConnection for CountingManager {
        type Connection = ();
        type Error = std::io::Error;

        fn connect(&self) -> std::result::Result<(), std::io::Error> {
            self.0.connects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn is_valid(&self, _conn: &mut ()) -> std::result::Result<(), std::io::Error> {
            self.0.validations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn has_broken(&self, _conn: &mut ()) -> bool {
            false
        }
    }

    #[test]
    fn test_pool_reuses_one_connection_without_pinging() {
        let counters = Arc::new(Counters::default());
        let pool = build_pool(CountingManager(counters.clone()), Duration::from_secs(5));

        for _ in 0..3 {
            let _conn = pool.get().unwrap();
        }

        assert_eq!(counters.connects.load(Ordering::SeqCst), 1);
        assert_eq!(counters.validations.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dictionary_queries_bind_owner_and_name() {
        for sql in [SQL_OBJECT_EXISTS, SQL_TABLE_STATISTICS, SQL_PROCEDURE_EXISTS, SQL_PROCEDURE_ARGUMENTS] {
            assert!(sql.contains(":1"));
            assert!(sql.contains(":2"));
        }
    }
}
