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

//! Command-line harness for the Oracle publisher.
//!
//! Connects with the configured settings, runs one protocol call and prints
//! the result as JSON. Streams (published records, acknowledgements, records
//! to write) travel as JSON lines over stdin/stdout; logs go to stderr.

use clap::Parser;
use log::{error, info};
use oracle_publisher::application::server::Server;
use oracle_publisher::application::write_back;
use oracle_publisher::config::{AppConfig, CliArgs, Command};
use oracle_publisher::domain::entities::{
    ConfigurationFormRequest, ConfigureWriteRequest, ConnectRequest, DisconnectRequest,
    DiscoverMode, DiscoverShapesRequest, PrepareWriteRequest, ReadRequest,
};
use oracle_publisher::domain::errors::Result;
use oracle_publisher::infrastructure::oracle::session::OracleConnector;
use oracle_publisher::infrastructure::stdio::{JsonLinesReader, JsonLinesWriter};
use oracle_publisher::ports::publisher_port::Publisher;
use serde::Serialize;
use serde_json::json;
use std::io::{self, BufReader, Read};
use std::process;
use std::sync::Arc;

fn main() {
    env_logger::init();

    let args = CliArgs::parse();

    let mut config = match &args.config {
        Some(path) => match AppConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to load config: {}", e);
                process::exit(1);
            }
        },
        None => AppConfig::default(),
    };
    config.merge_cli(&args);

    let server = Server::new(Arc::new(OracleConnector));
    let outcome = run(&server, &config, &args.command);
    if let Err(e) = server.disconnect(DisconnectRequest {}) {
        error!("Disconnect failed: {}", e);
    }

    if let Err(e) = outcome {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(server: &Server, config: &AppConfig, command: &Command) -> Result<()> {
    config.settings.validate()?;
    server.connect(ConnectRequest {
        settings_json: serde_json::to_string(&config.settings)?,
    })?;

    match command {
        Command::Discover { refresh } => {
            let request = if *refresh {
                DiscoverShapesRequest {
                    mode: DiscoverMode::Refresh,
                    to_refresh: serde_json::from_str(&read_stdin()?)?,
                    sample_size: config.sample_size,
                }
            } else {
                DiscoverShapesRequest {
                    sample_size: config.sample_size,
                    ..Default::default()
                }
            };
            let response = server.discover_shapes(request)?;
            info!("Discovered {} shape(s)", response.shapes.len());
            print_json(&response)
        }
        Command::Publish { limit } => {
            let mut request: ReadRequest = serde_json::from_str(&read_stdin()?)?;
            if *limit > 0 {
                request.limit = *limit;
            }
            let mut sink = JsonLinesWriter::new(io::stdout());
            server.publish_stream(request, &mut sink)?;
            info!("Published {} record(s)", sink.written());
            Ok(())
        }
        Command::ConfigureWrite { procedure } => {
            let response = server.configure_write(write_form(procedure.as_deref()))?;
            print_json(&response)
        }
        Command::Write { procedure } => {
            let configured = server.configure_write(write_form(Some(procedure)))?;
            let shape = write_back::write_target(configured)?;
            server.prepare_write(PrepareWriteRequest {
                shape,
                commit_sla_seconds: config.commit_sla_seconds,
            })?;

            let mut source = JsonLinesReader::new(BufReader::new(io::stdin()));
            let mut acks = JsonLinesWriter::new(io::stdout());
            server.write_stream(&mut source, &mut acks)?;
            info!("Acknowledged {} record(s)", acks.written());
            Ok(())
        }
    }
}

fn write_form(procedure: Option<&str>) -> ConfigureWriteRequest {
    ConfigureWriteRequest {
        form: procedure.map(|p| ConfigurationFormRequest {
            data_json: json!({ "storedProcedure": p }).to_string(),
            ..Default::default()
        }),
    }
}

fn read_stdin() -> Result<String> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    Ok(input)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
