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

//! JSON-lines streams over any reader or writer.
//!
//! The command-line harness uses these to feed `publish` output to stdout and
//! to read write-back records from stdin: one JSON document per line, blank
//! lines ignored.

use crate::domain::entities::{Record, RecordAck};
use crate::domain::errors::{ConnectorError, Result};
use crate::ports::stream_port::{AckSink, RecordSink, RecordSource};
use serde::Serialize;
use std::io::{BufRead, Write};

/// Writes each message as one line of JSON.
pub struct JsonLinesWriter<W: Write + Send> {
    out: W,
    written: u64,
}

impl<W: Write + Send> JsonLinesWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line<T: Serialize>(&mut self, message: &T) -> Result<()> {
        let line = serde_json::to_string(message)?;
        writeln!(self.out, "{}", line)
            .and_then(|_| self.out.flush())
            .map_err(|e| ConnectorError::Transport(e.to_string()))?;
        self.written += 1;
        Ok(())
    }
}

impl<W: Write + Send> RecordSink for JsonLinesWriter<W> {
    fn send(&mut self, record: Record) -> Result<()> {
        self.write_line(&record)
    }
}

impl<W: Write + Send> AckSink for JsonLinesWriter<W> {
    fn send(&mut self, ack: RecordAck) -> Result<()> {
        self.write_line(&ack)
    }
}

/// Reads one `Record` per non-blank line until end of input.
pub struct JsonLinesReader<R: BufRead + Send> {
    input: R,
    line_number: u64,
}

impl<R: BufRead + Send> JsonLinesReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            line_number: 0,
        }
    }
}

impl<R: BufRead + Send> RecordSource for JsonLinesReader<R> {
    fn recv(&mut self) -> Result<Option<Record>> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = self
                .input
                .read_line(&mut line)
                .map_err(|e| ConnectorError::Transport(e.to_string()))?;
            if read == 0 {
                return Ok(None);
            }
            self.line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            return serde_json::from_str(line.trim()).map(Some).map_err(|e| {
                ConnectorError::Transport(format!("line {}: {}", self.line_number, e))
            });
        }
    }
}
