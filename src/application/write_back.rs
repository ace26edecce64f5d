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

//! Write-back through stored procedures.
//!
//! Writing happens in three steps:
//! 1. **Configure**: the host shows a form, the user picks a procedure and the
//!    connector answers with a shape whose properties are the procedure's IN
//!    parameters.
//! 2. **Prepare**: the negotiated shape is frozen into a [`PreparedWrite`].
//! 3. **Write**: each incoming record is decoded against the parameter order
//!    and passed to the procedure. Every record gets exactly one ack.
//!
//! Acks are produced on the calling thread and flushed by a second thread,
//! which sends them when a batch fills up or when the commit SLA has elapsed
//! since the oldest unsent ack, whichever comes first.

use crate::application::discovery::property_for_column;
use crate::domain::entities::{
    ConfigurationFormResponse, ConfigureWriteRequest, ConfigureWriteResponse, PrepareWriteRequest,
    Property, Record, RecordAck, Shape,
};
use crate::domain::errors::{ConnectorError, Result};
use crate::domain::mapping::{decode_value, BindValue};
use crate::domain::sql::ObjectRef;
use crate::ports::database_port::DatabaseSession;
use crate::ports::stream_port::{AckSink, RecordSource};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::thread;
use std::time::{Duration, Instant};

pub const PROCEDURE_NOT_FOUND: &str = "stored procedure does not exist";

/// Acks sent to the host in one go.
const ACK_BATCH_SIZE: usize = 100;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WriteFormData {
    stored_procedure: Option<String>,
}

/// What the host sent to `configure_write`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteConfiguration {
    /// First call: no form data yet.
    Empty,
    Candidate { stored_procedure: String },
}

impl WriteConfiguration {
    pub fn from_request(request: &ConfigureWriteRequest) -> Result<Self> {
        let data_json = match &request.form {
            Some(form) if !form.data_json.trim().is_empty() => &form.data_json,
            _ => return Ok(WriteConfiguration::Empty),
        };

        let data: WriteFormData = serde_json::from_str(data_json)
            .map_err(|e| ConnectorError::Write(format!("invalid form data: {}", e)))?;
        Ok(match data.stored_procedure.as_deref().map(str::trim) {
            Some(procedure) if !procedure.is_empty() => WriteConfiguration::Candidate {
                stored_procedure: procedure.to_string(),
            },
            _ => WriteConfiguration::Empty,
        })
    }
}

pub fn configure_write(
    db: &mut dyn DatabaseSession,
    request: &ConfigureWriteRequest,
) -> Result<ConfigureWriteResponse> {
    let configuration = WriteConfiguration::from_request(request)?;

    let procedures = db.list_procedures().unwrap_or_else(|e| {
        warn!("Could not list stored procedures: {}", e);
        Vec::new()
    });
    let names: Vec<String> = procedures.iter().map(ObjectRef::display_name).collect();

    let mut form = ConfigurationFormResponse {
        schema_json: form_schema(&names).to_string(),
        ui_json: json!({ "ui:order": ["storedProcedure"] }).to_string(),
        ..Default::default()
    };
    if let Some(submitted) = &request.form {
        form.data_json = submitted.data_json.clone();
        form.state_json = submitted.state_json.clone();
    }

    let stored_procedure = match configuration {
        WriteConfiguration::Empty => return Ok(ConfigureWriteResponse { form, shape: None }),
        WriteConfiguration::Candidate { stored_procedure } => stored_procedure,
    };

    let mut shape = Shape::new(stored_procedure.clone(), stored_procedure.clone())
        .with_query(stored_procedure.clone());
    match resolve_parameters(db, &stored_procedure) {
        Ok(Some(parameters)) => {
            info!(
                "Write target {} takes {} parameters",
                stored_procedure,
                parameters.len()
            );
            shape.properties = parameters;
        }
        Ok(None) => form.errors.push(PROCEDURE_NOT_FOUND.to_string()),
        Err(e) => form.errors.push(format!("{}: {}", PROCEDURE_NOT_FOUND, e)),
    }

    Ok(ConfigureWriteResponse {
        form,
        shape: Some(shape),
    })
}

/// The shape to prepare from a completed form, or the form's errors.
pub fn write_target(response: ConfigureWriteResponse) -> Result<Shape> {
    if !response.form.errors.is_empty() {
        return Err(ConnectorError::Write(response.form.errors.join("; ")));
    }
    response
        .shape
        .ok_or_else(|| ConnectorError::Write("no stored procedure selected".to_string()))
}

fn form_schema(procedures: &[String]) -> Value {
    let mut stored_procedure = json!({
        "type": "string",
        "title": "Stored Procedure",
        "description": "OWNER.PROCEDURE to call for every record",
    });
    if !procedures.is_empty() {
        stored_procedure["enum"] = json!(procedures);
    }
    json!({
        "type": "object",
        "properties": { "storedProcedure": stored_procedure },
        "required": ["storedProcedure"],
    })
}

fn resolve_parameters(db: &mut dyn DatabaseSession, name: &str) -> Result<Option<Vec<Property>>> {
    let procedure = ObjectRef::parse(name)?;
    Ok(db.describe_procedure(&procedure)?.map(|arguments| {
        arguments
            .iter()
            .map(|argument| property_for_column(argument, argument.name.clone()))
            .collect()
    }))
}

/// The frozen execution context for `write_stream`.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedWrite {
    pub procedure: ObjectRef,
    /// Parameter order; record values are bound in this order.
    pub parameters: Vec<Property>,
    pub commit_sla: Duration,
}

pub fn prepare_write(request: &PrepareWriteRequest) -> Result<PreparedWrite> {
    let shape = &request.shape;
    let target = shape
        .row_query()
        .or_else(|| Some(shape.id.trim()).filter(|id| !id.is_empty()))
        .ok_or_else(|| ConnectorError::Write("shape has no write target".to_string()))?;
    let procedure = ObjectRef::parse(target).map_err(|e| ConnectorError::Write(e.to_string()))?;

    info!(
        "Prepared write to {} with {} parameters (commit SLA {}s)",
        procedure.display_name(),
        shape.properties.len(),
        request.commit_sla_seconds
    );
    Ok(PreparedWrite {
        procedure,
        parameters: shape.properties.clone(),
        commit_sla: Duration::from_secs(u64::from(request.commit_sla_seconds)),
    })
}

/// Writes every record from `source`, acking each one on `acks`.
///
/// Failures of a single record travel on its ack. A failure to receive a
/// record or to send an ack aborts the call. Returns the number of records written.
pub fn write_stream(
    db: &mut dyn DatabaseSession,
    prepared: &PreparedWrite,
    source: &mut dyn RecordSource,
    acks: &mut dyn AckSink,
) -> Result<u64> {
    let (sender, receiver) = crossbeam_channel::bounded::<RecordAck>(ACK_BATCH_SIZE * 2);
    let commit_sla = prepared.commit_sla;

    thread::scope(|scope| -> Result<u64> {
        let flusher = scope.spawn(move || flush_acks(receiver, acks, commit_sla));

        let mut written = 0;
        let received = loop {
            let record = match source.recv() {
                Ok(Some(record)) => record,
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            };
            // The flusher only stops early when acks can no longer be delivered.
            // Its error is reported below; no further record may reach the database.
            if flusher.is_finished() {
                warn!("Ack stream failed, not writing record {}", record.correlation_id);
                break Ok(());
            }
            if sender.send(write_record(db, prepared, record)).is_err() {
                break Ok(());
            }
            written += 1;
        };
        drop(sender);

        let flushed = flusher
            .join()
            .map_err(|_| ConnectorError::Transport("ack flusher panicked".to_string()))?;
        received.and(flushed)?;

        info!("Wrote {} records to {}", written, prepared.procedure.display_name());
        Ok(written)
    })
}

fn write_record(db: &mut dyn DatabaseSession, prepared: &PreparedWrite, record: Record) -> RecordAck {
    let outcome = bind_arguments(&prepared.parameters, &record.data_json)
        .and_then(|arguments| db.call_procedure(&prepared.procedure, &arguments));
    match outcome {
        Ok(()) => RecordAck::success(record.correlation_id),
        Err(e) => {
            warn!("Record {} failed: {}", record.correlation_id, e);
            RecordAck::failure(record.correlation_id, e.to_string())
        }
    }
}

/// Picks each parameter's value out of the record, in parameter order.
fn bind_arguments(parameters: &[Property], data_json: &str) -> Result<Vec<BindValue>> {
    let data: Map<String, Value> = serde_json::from_str(data_json)
        .map_err(|e| ConnectorError::Decode(format!("record is not a JSON object: {}", e)))?;

    parameters
        .iter()
        .map(|parameter| {
            let value = data.get(&parameter.id).unwrap_or(&Value::Null);
            decode_value(parameter.property_type, value)
                .map_err(|e| ConnectorError::Decode(format!("{}: {}", parameter.id, e)))
        })
        .collect()
}

fn flush_acks(receiver: Receiver<RecordAck>, acks: &mut dyn AckSink, commit_sla: Duration) -> Result<()> {
    let mut pending: Vec<RecordAck> = Vec::with_capacity(ACK_BATCH_SIZE);
    let mut deadline = Instant::now();

    loop {
        // Nothing buffered means nothing is due, so block without a deadline.
        let next = if pending.is_empty() {
            receiver.recv().map_err(|_| RecvTimeoutError::Disconnected)
        } else {
            receiver.recv_deadline(deadline)
        };

        match next {
            Ok(ack) => {
                if pending.is_empty() {
                    deadline = Instant::now() + commit_sla;
                }
                pending.push(ack);
                if pending.len() >= ACK_BATCH_SIZE {
                    send_all(&mut pending, acks)?;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                debug!("Commit SLA elapsed, flushing {} acks", pending.len());
                send_all(&mut pending, acks)?;
            }
            Err(RecvTimeoutError::Disconnected) => {
                send_all(&mut pending, acks)?;
                return Ok(());
            }
        }
    }
}

fn send_all(pending: &mut Vec<RecordAck>, acks: &mut dyn AckSink) -> Result<()> {
    for ack in pending.drain(..) {
        acks.send(ack)?;
    }
    Ok(())
}
