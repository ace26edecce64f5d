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

//! Owns the single database session and the settings it was opened with.
//!
//! Every data-path call goes through [`ConnectionManager::with_session`], which
//! checks the state under the same lock that `connect` and `disconnect` take.
//! After a disconnect no call can reach the old session.

use crate::application::write_back::PreparedWrite;
use crate::config::Settings;
use crate::domain::errors::{ConnectorError, Result};
use crate::ports::database_port::{Connector, DatabaseSession};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Everything that exists only while connected.
pub struct ActiveSession {
    pub settings: Settings,
    pub database: Box<dyn DatabaseSession>,
    /// Set by `prepare_write`, consumed by `write_stream`.
    pub prepared_write: Option<PreparedWrite>,
}

enum ConnectionState {
    Disconnected,
    Connected(ActiveSession),
}

pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    state: Mutex<ConnectionState>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            state: Mutex::new(ConnectionState::Disconnected),
        }
    }

    /// Opens a session from the JSON settings payload.
    ///
    /// On failure the previous state (connected or not) is left as it was.
    pub fn connect(&self, settings_json: &str) -> Result<()> {
        let settings = Settings::from_json(settings_json)?;
        info!(
            "Connecting to {} as {}",
            settings.get_connection_string(),
            settings.username
        );

        let mut state = self.lock();
        let database = self.connector.open(&settings).map_err(|e| match e {
            ConnectorError::Connection(_) => e,
            other => ConnectorError::Connection(other.to_string()),
        })?;

        let previous = std::mem::replace(
            &mut *state,
            ConnectionState::Connected(ActiveSession {
                settings,
                database,
                prepared_write: None,
            }),
        );
        if let ConnectionState::Connected(mut old) = previous {
            debug!("Replacing existing session");
            if let Err(e) = old.database.close() {
                warn!("Failed to close previous session: {}", e);
            }
        }
        info!("Connected");
        Ok(())
    }

    /// Closes the session if there is one. Always succeeds.
    pub fn disconnect(&self) {
        let previous = std::mem::replace(&mut *self.lock(), ConnectionState::Disconnected);
        if let ConnectionState::Connected(mut session) = previous {
            if let Err(e) = session.database.close() {
                warn!("Failed to close session: {}", e);
            }
            info!("Disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(*self.lock(), ConnectionState::Connected(_))
    }

    /// Runs `f` against the open session, or fails with `not connected`.
    pub fn with_session<T>(&self, f: impl FnOnce(&mut ActiveSession) -> Result<T>) -> Result<T> {
        match &mut *self.lock() {
            ConnectionState::Connected(session) => f(session),
            ConnectionState::Disconnected => Err(ConnectorError::NotConnected),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConnectionState> {
        // A panic inside a call must not wedge every later call.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
