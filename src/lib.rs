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

//! # Oracle Publisher
//!
//! Exposes Oracle tables, views and ad-hoc queries to a data-integration host
//! as typed shapes and record streams, and writes host records back through
//! stored procedures.
//!
//! This crate follows the **Hexagonal Architecture** (Ports and Adapters):
//! `domain` holds the pure rules, `ports` the traits, `application` the
//! protocol logic and `infrastructure` the Oracle driver and stream adapters.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ports;
