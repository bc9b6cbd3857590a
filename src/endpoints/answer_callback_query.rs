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

//! Handler for the answerCallbackQuery method.
//!
//! # Description
//!
//! The HTTP side of the callback round trip: the answer is deposited in the
//! mailbox keyed by `query_id`, where the watcher spawned by the ingest
//! picks it up and forwards it to the backend. The HTTP caller gets its
//! acknowledgment immediately.

use chrono::Utc;
use serde_json::Value;
use tracing::info;

use super::helper::{coerce_bool, coerce_i64, coerce_string};
use crate::{
    errors::GatewayError,
    state::GatewayState,
    storage::CallbackAnswer,
    wire::Params,
};

pub async fn answer_callback_query(
    state: &GatewayState,
    params: &Params,
) -> Result<Value, GatewayError> {
    let query_id = params
        .get("callback_query_id")
        .and_then(coerce_string)
        .ok_or(GatewayError::MissingCallbackQueryId)?;

    let answer = CallbackAnswer {
        query_id: query_id.clone(),
        alert: params
            .get("show_alert")
            .and_then(coerce_bool)
            .unwrap_or(false),
        message: params.get("text").and_then(coerce_string),
        url: params.get("url").and_then(coerce_string),
        cache_time: params.get("cache_time").and_then(coerce_i64).unwrap_or(0),
        created_at: Utc::now().timestamp(),
    };

    state.callbacks.put(&answer).await?;

    info!("Answer stored for query_id: {query_id}");

    Ok(Value::Bool(true))
}
