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

//! The "Native Database" port.
//!
//! Everything the application layer needs from Oracle goes through these
//! traits: catalog introspection, parameterized execution and one-pass row
//! iteration. The Oracle adapter implements them with the `oracle` driver; the
//! tests implement them in memory.

use crate::config::Settings;
use crate::domain::errors::Result;
use crate::domain::mapping::{BindValue, NativeType, NativeValue};
use crate::domain::sql::{ObjectRef, RowSource, SelectStatement};

/// A column of a row source, or an IN parameter of a procedure.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub native_type: NativeType,
    pub nullable: bool,
    /// The type as the catalog spells it, reported as `typeAtSource`.
    pub source_type: String,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, native_type: NativeType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            source_type: native_type.to_string(),
            native_type,
            nullable,
        }
    }

    /// Procedure arguments carry no length, so their declared name is kept verbatim.
    pub fn with_source_type(mut self, source_type: impl Into<String>) -> Self {
        self.source_type = source_type.into();
        self
    }
}

/// Rows produced by an executing query, fetched one at a time.
pub trait RowCursor: Iterator<Item = Result<Vec<NativeValue>>> {
    /// Columns of every row, in select-list order.
    fn columns(&self) -> &[ColumnDescriptor];
}

/// One open database session.
pub trait DatabaseSession: Send {
    /// User tables and views, excluding Oracle-maintained schemas.
    fn list_objects(&mut self) -> Result<Vec<ObjectRef>>;

    fn object_exists(&mut self, object: &ObjectRef) -> Result<bool>;

    /// Column metadata of a row source without fetching rows.
    fn describe(&mut self, source: &RowSource) -> Result<Vec<ColumnDescriptor>>;

    fn query<'a>(&'a mut self, statement: &SelectStatement) -> Result<Box<dyn RowCursor + 'a>>;

    fn count(&mut self, statement: &SelectStatement) -> Result<u64>;

    /// Row count from optimizer statistics, if the object has any.
    fn estimate_count(&mut self, object: &ObjectRef) -> Result<Option<u64>>;

    fn list_procedures(&mut self) -> Result<Vec<ObjectRef>>;

    /// IN parameters in declared order, or `None` if the procedure does not exist.
    fn describe_procedure(&mut self, procedure: &ObjectRef)
        -> Result<Option<Vec<ColumnDescriptor>>>;

    fn call_procedure(&mut self, procedure: &ObjectRef, arguments: &[BindValue]) -> Result<()>;

    /// Runs a statement supplied by the user's settings (pre/post-publish queries).
    fn execute(&mut self, sql: &str) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}

/// Opens sessions from connection settings.
pub trait Connector: Send + Sync {
    fn open(&self, settings: &Settings) -> Result<Box<dyn DatabaseSession>>;
}
