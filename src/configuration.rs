// Copyright 2025 Felipe Torres González
//
//    Licensed under the Apache License, Version 2.0 (the "License");
//    you may not use this file except in compliance with the License.
//    You may obtain a copy of the License at
//
//        http://www.apache.org/licenses/LICENSE-2.0
//
//    Unless required by applicable law or agreed to in writing, software
//    distributed under the License is distributed on an "AS IS" BASIS,
//    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//    See the License for the specific language governing permissions and
//    limitations under the License.

//! GateBot configuration module
//!
//! # Description
//!
//! This module includes all the definitions for the app's settings and the
//! objects that automate reading the configuration from the environment and
//! parsing it to Rust's native types.
//!
//! The gateway is configured exclusively through environment variables:
//! `MONGODB_URI`, `DOMAIN`, `PORT`, `API_ID`, `API_HASH`, `PUBLIC_KEY` and
//! `ADMIN_API_URL` are required, the rest carry defaults. A missing required
//! variable is a fatal startup error surfaced as a [`ConfigError`].

use config::{Config, ConfigError, Environment};
use secrecy::SecretString;
use serde_derive::Deserialize;

/// Main settings `struct`.
///
/// # Description
///
/// - [Settings::mongodb_uri]: connection string of the backend data store.
/// - [Settings::domain] and [Settings::port]: endpoint of the backend
///   data-center the user clients connect to.
/// - [Settings::api_id] and [Settings::api_hash]: application credentials
///   presented by every client session.
/// - [Settings::public_key]: RSA public key of the backend, installed into
///   the client key table at startup.
/// - [Settings::admin_api_url]: base URL of the backend's administrative
///   REST API.
#[derive(Debug, Deserialize)]
pub struct Settings {
    pub mongodb_uri: SecretString,
    pub domain: String,
    pub port: u16,
    pub api_id: i32,
    pub api_hash: SecretString,
    pub public_key: SecretString,
    pub admin_api_url: String,
    /// Phone number of the privileged "BotFather" account. Optional; without
    /// it the privileged token bootstrap is skipped.
    pub botfather_phone: Option<String>,
    #[serde(default = "default_brand")]
    pub brand: String,
    /// Port the HTTP surface listens on.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Directory holding the client session files.
    #[serde(default = "default_sessions_dir")]
    pub sessions_dir: String,
    /// Level for the tracing crate.
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(Environment::default().try_parsing(true))
            .build()?;

        settings.try_deserialize()
    }
}

fn default_brand() -> String {
    String::from("Bot API Server")
}

fn default_http_port() -> u16 {
    5449
}

fn default_sessions_dir() -> String {
    String::from("sessions")
}

fn default_tracing_level() -> String {
    String::from("info")
}
