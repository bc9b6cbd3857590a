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

//! Tracing setup for the gateway.

use tracing::{
    Level,
    subscriber::{Subscriber, set_global_default},
};
use tracing_subscriber::FmtSubscriber;

/// Build a subscriber whose maximum level is parsed from the settings.
/// Unknown level names fall back to `TRACE`.
pub fn get_subscriber(tracing_level: &str) -> impl Subscriber + Send + Sync {
    let tracing_level = match tracing_level {
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(tracing_level)
        .finish()
}

pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) {
    set_global_default(subscriber).expect("Failed to set subscriber.");
}
