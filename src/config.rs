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

//! Connection settings and developer-binary configuration.
//!
//! `Settings` is the JSON payload the host sends with `Connect`. `AppConfig`
//! wraps it for the `oracle-publisher` binary, which can read it from a YAML or
//! JSON file and override individual fields from the command line.

use crate::domain::errors::{ConnectorError, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Read;

const DEFAULT_PORT: u16 = 1521;

/// Connection settings for one Oracle database. Immutable once connected.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub hostname: String,
    pub port: u16,
    pub service_name: String,
    pub username: String,
    pub password: Option<String>,
    /// Full connect string (EZConnect or TNS alias); wins over host/port/service.
    pub connection_string: Option<String>,
    pub pre_publish_query: Option<String>,
    pub post_publish_query: Option<String>,
    /// Report optimizer-statistics counts (ESTIMATE) instead of `COUNT(*)` when available.
    pub estimate_counts: bool,
    pub connect_timeout_seconds: Option<u64>,
    pub prefetch_rows: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            port: DEFAULT_PORT,
            service_name: String::new(),
            username: String::new(),
            password: None,
            connection_string: None,
            pre_publish_query: None,
            post_publish_query: None,
            estimate_counts: false,
            connect_timeout_seconds: None,
            prefetch_rows: None,
        }
    }
}

// Keeps the password out of logs.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("service_name", &self.service_name)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("connection_string", &self.connection_string)
            .field("estimate_counts", &self.estimate_counts)
            .finish_non_exhaustive()
    }
}

impl Settings {
    /// Parses and validates the `Connect` payload.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)
            .map_err(|e| ConnectorError::Settings(format!("malformed settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(ConnectorError::Settings("username is required".to_string()));
        }
        let has_override = self
            .connection_string
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty());
        if !has_override {
            if self.hostname.trim().is_empty() {
                return Err(ConnectorError::Settings("hostname is required".to_string()));
            }
            if self.service_name.trim().is_empty() {
                return Err(ConnectorError::Settings("serviceName is required".to_string()));
            }
        }
        Ok(())
    }

    pub fn get_connection_string(&self) -> String {
        match self.connection_string.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => format!("//{}:{}/{}", self.hostname, self.port, self.service_name),
        }
    }

    /// The configured password, falling back to `ORACLE_PASSWORD`.
    pub fn resolved_password(&self) -> String {
        self.password
            .clone()
            .or_else(|| std::env::var("ORACLE_PASSWORD").ok())
            .unwrap_or_default()
    }

    pub fn pre_publish(&self) -> Option<&str> {
        non_blank(self.pre_publish_query.as_deref())
    }

    pub fn post_publish(&self) -> Option<&str> {
        non_blank(self.post_publish_query.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Configuration file for the developer binary.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub settings: Settings,
    /// Number of sample records requested during discovery.
    pub sample_size: u32,
    pub commit_sla_seconds: u32,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<String>,

    // Overrides for ad-hoc runs
    #[arg(long)]
    pub username: Option<String>,
    #[arg(long)]
    pub password: Option<String>,
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long)]
    pub port: Option<u16>,
    #[arg(long)]
    pub service: Option<String>,
    #[arg(long)]
    pub sample_size: Option<u32>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Discover every table and view (or refresh the shapes read from stdin)
    Discover {
        #[arg(long)]
        refresh: bool,
    },
    /// Publish the read request (shape, filters, limit) from stdin as JSON lines on stdout
    Publish {
        #[arg(long, default_value_t = 0)]
        limit: u32,
    },
    /// Build the write-back shape for a stored procedure
    ConfigureWrite {
        #[arg(long)]
        procedure: Option<String>,
    },
    /// Call a stored procedure for every record read from stdin
    Write {
        #[arg(long)]
        procedure: String,
    },
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: AppConfig = if path.ends_with(".json") {
            serde_json::from_str(&contents)?
        } else {
            serde_yaml::from_str(&contents).map_err(|e| ConnectorError::Settings(e.to_string()))?
        };

        Ok(config)
    }

    pub fn merge_cli(&mut self, args: &CliArgs) {
        if let Some(u) = &args.username { self.settings.username = u.clone(); }
        if let Some(p) = &args.password { self.settings.password = Some(p.clone()); }
        if let Some(h) = &args.host { self.settings.hostname = h.clone(); }
        if let Some(p) = args.port { self.settings.port = p; }
        if let Some(s) = &args.service { self.settings.service_name = s.clone(); }
        if let Some(n) = args.sample_size { self.sample_size = n; }
    }
}
