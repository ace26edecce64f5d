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

//! The publisher protocol as seen by the host.

use crate::domain::entities::{
    ConfigureWriteRequest, ConfigureWriteResponse, ConnectRequest, ConnectResponse,
    DisconnectRequest, DisconnectResponse, DiscoverShapesRequest, DiscoverShapesResponse,
    PrepareWriteRequest, PrepareWriteResponse, ReadRequest,
};
use crate::domain::errors::Result;
use crate::ports::stream_port::{AckSink, RecordSink, RecordSource};

pub trait Publisher: Send + Sync {
    /// Opens the session described by `settings_json`, replacing any previous one.
    fn connect(&self, request: ConnectRequest) -> Result<ConnectResponse>;

    fn discover_shapes(&self, request: DiscoverShapesRequest) -> Result<DiscoverShapesResponse>;

    /// Streams the shape's rows into `sink`, one record per row.
    fn publish_stream(&self, request: ReadRequest, sink: &mut dyn RecordSink) -> Result<()>;

    fn configure_write(&self, request: ConfigureWriteRequest) -> Result<ConfigureWriteResponse>;

    fn prepare_write(&self, request: PrepareWriteRequest) -> Result<PrepareWriteResponse>;

    /// Writes every record from `source` and acknowledges each one on `acks`.
    fn write_stream(&self, source: &mut dyn RecordSource, acks: &mut dyn AckSink) -> Result<()>;

    fn disconnect(&self, request: DisconnectRequest) -> Result<DisconnectResponse>;
}
