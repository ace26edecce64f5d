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

//! Core error definitions for the Oracle publisher.
//!
//! This module provides a centralized `ConnectorError` enum and a `Result` type
//! used throughout the crate. Each variant corresponds to one class of failure
//! the protocol distinguishes: bad settings, a failed logon, calls made while
//! disconnected, problems with a single shape or record, and transport failures
//! that abort the whole call.

use thiserror::Error;

/// Error types surfaced by the connector.
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// The settings payload could not be parsed or is incomplete.
    #[error("Settings error: {0}")]
    Settings(String),

    /// The database rejected the logon or could not be reached.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A data-path call was made without an open session.
    #[error("not connected")]
    NotConnected,

    #[error("Discovery failed: {0}")]
    Discovery(String),

    #[error("Invalid filter: {0}")]
    Filter(String),

    /// A record value could not be converted for the target parameter.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Write error: {0}")]
    Write(String),

    /// The caller's stream failed on send or receive.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Oracle error: {0}")]
    Database(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<oracle::Error> for ConnectorError {
    fn from(e: oracle::Error) -> Self {
        ConnectorError::Database(e.to_string())
    }
}

/// A specialized Result type for the Oracle publisher.
pub type Result<T> = std::result::Result<T, ConnectorError>;
