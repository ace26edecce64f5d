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

//! Record and acknowledgement streams supplied by the caller.
//!
//! A failed `send` or `recv` is a transport error: it aborts the running call
//! and is returned to the caller as-is.

use crate::domain::entities::{Record, RecordAck};
use crate::domain::errors::Result;
use std::collections::VecDeque;

pub trait RecordSink: Send {
    fn send(&mut self, record: Record) -> Result<()>;
}

pub trait AckSink: Send {
    fn send(&mut self, ack: RecordAck) -> Result<()>;
}

pub trait RecordSource: Send {
    /// The next record, or `None` once the caller has finished sending.
    fn recv(&mut self) -> Result<Option<Record>>;
}

impl RecordSink for Vec<Record> {
    fn send(&mut self, record: Record) -> Result<()> {
        self.push(record);
        Ok(())
    }
}

impl AckSink for Vec<RecordAck> {
    fn send(&mut self, ack: RecordAck) -> Result<()> {
        self.push(ack);
        Ok(())
    }
}

impl RecordSource for VecDeque<Record> {
    fn recv(&mut self) -> Result<Option<Record>> {
        Ok(self.pop_front())
    }
}
