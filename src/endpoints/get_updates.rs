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

//! Handler for the getUpdates method.
//!
//! # Description
//!
//! Long-poll contract: the queue is read at least once, even with
//! `timeout = 0`. While it stays empty and the caller-supplied timeout has
//! not elapsed, the handler sleeps in one-second steps and reads again; the
//! answer is whatever accumulated, possibly nothing.

use std::time::{Duration, Instant};

use serde_json::{Value, json};

use crate::{
    MAX_TIMEOUT, MAX_UPDATES_LIMIT, POLL_INTERVAL, errors::GatewayError, state::GatewayState,
    wire::Params,
};

use super::helper::coerce_i64;

pub async fn get_updates(
    state: &GatewayState,
    bot_id: i64,
    params: &Params,
) -> Result<Value, GatewayError> {
    let offset = params.get("offset").and_then(coerce_i64).unwrap_or(0);
    let limit = params
        .get("limit")
        .and_then(coerce_i64)
        .unwrap_or(MAX_UPDATES_LIMIT)
        .min(MAX_UPDATES_LIMIT);
    let limit = usize::try_from(limit).unwrap_or(0);
    let timeout = params
        .get("timeout")
        .and_then(coerce_i64)
        .unwrap_or(0)
        .clamp(0, MAX_TIMEOUT) as u64;

    let deadline = Instant::now() + Duration::from_secs(timeout);

    loop {
        let updates = state.updates.get(bot_id, offset, limit);

        if !updates.is_empty() {
            return serde_json::to_value(updates)
                .map_err(|err| GatewayError::Internal(err.to_string()));
        }

        if timeout == 0 || Instant::now() >= deadline {
            return Ok(json!([]));
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
