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

//! The `Publisher` implementation.
//!
//! `Server` wires the components together: the connection manager gates every
//! call, discovery and the streamer share the open session, and write-back
//! keeps its prepared context on the session so a reconnect discards it.

use crate::application::connection::{ActiveSession, ConnectionManager};
use crate::application::{discovery, streamer, write_back};
use crate::domain::entities::{
    ConfigureWriteRequest, ConfigureWriteResponse, ConnectRequest, ConnectResponse,
    DisconnectRequest, DisconnectResponse, DiscoverShapesRequest, DiscoverShapesResponse,
    PrepareWriteRequest, PrepareWriteResponse, ReadRequest,
};
use crate::domain::errors::{ConnectorError, Result};
use crate::ports::database_port::Connector;
use crate::ports::publisher_port::Publisher;
use crate::ports::stream_port::{AckSink, RecordSink, RecordSource};
use log::{error, info};
use std::sync::Arc;

pub struct Server {
    connection: ConnectionManager,
}

impl Server {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connection: ConnectionManager::new(connector),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }
}

/// Runs the pre-publish query, the publish itself and then the post-publish
/// query, which runs even when the publish failed.
fn publish_with_hooks(
    session: &mut ActiveSession,
    request: &ReadRequest,
    sink: &mut dyn RecordSink,
) -> Result<()> {
    if let Some(query) = session.settings.pre_publish().map(str::to_string) {
        info!("Running pre-publish query");
        session.database.execute(&query)?;
    }

    let published = streamer::publish(session.database.as_mut(), request, sink);

    let post_failure = match session.settings.post_publish().map(str::to_string) {
        Some(query) => {
            info!("Running post-publish query");
            session.database.execute(&query).err()
        }
        None => None,
    };

    match (published, post_failure) {
        (Ok(_), None) => Ok(()),
        (Ok(_), Some(post)) => Err(post),
        (Err(e), None) => Err(e),
        (Err(e), Some(post)) => Err(ConnectorError::Database(format!(
            "{}; post-publish query also failed: {}",
            e, post
        ))),
    }
}

impl Publisher for Server {
    fn connect(&self, request: ConnectRequest) -> Result<ConnectResponse> {
        self.connection.connect(&request.settings_json).map_err(|e| {
            error!("Connect failed: {}", e);
            e
        })?;
        Ok(ConnectResponse {})
    }

    fn discover_shapes(&self, request: DiscoverShapesRequest) -> Result<DiscoverShapesResponse> {
        self.connection.with_session(|session| {
            discovery::discover_shapes(session.database.as_mut(), &session.settings, &request)
        })
    }

    fn publish_stream(&self, request: ReadRequest, sink: &mut dyn RecordSink) -> Result<()> {
        self.connection
            .with_session(|session| publish_with_hooks(session, &request, sink))
    }

    fn configure_write(&self, request: ConfigureWriteRequest) -> Result<ConfigureWriteResponse> {
        self.connection
            .with_session(|session| write_back::configure_write(session.database.as_mut(), &request))
    }

    fn prepare_write(&self, request: PrepareWriteRequest) -> Result<PrepareWriteResponse> {
        self.connection.with_session(|session| {
            session.prepared_write = Some(write_back::prepare_write(&request)?);
            Ok(PrepareWriteResponse {})
        })
    }

    fn write_stream(&self, source: &mut dyn RecordSource, acks: &mut dyn AckSink) -> Result<()> {
        self.connection.with_session(|session| {
            let ActiveSession {
                database,
                prepared_write,
                ..
            } = session;
            let prepared = prepared_write.as_ref().ok_or_else(|| {
                ConnectorError::Write("write has not been prepared".to_string())
            })?;
            write_back::write_stream(database.as_mut(), prepared, source, acks).map(|_| ())
        })
    }

    fn disconnect(&self, _request: DisconnectRequest) -> Result<DisconnectResponse> {
        self.connection.disconnect();
        Ok(DisconnectResponse {})
    }
}
