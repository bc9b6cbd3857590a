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

//! Callback-answer reconciliation.
//!
//! # Description
//!
//! A pressed button and its `answerCallbackQuery` arrive on two independent
//! paths: the event reaches the ingest through the client session, the
//! answer reaches the mailbox through HTTP. The watcher spawned per
//! `query_id` bridges that gap: it polls the mailbox on a fixed cadence and
//! forwards the first deposit to the backend's `/answer-callback`, then
//! deletes the record. A caller that never answers simply exhausts the
//! retry budget; that is not an error.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::{
    CALLBACK_CHECK_INTERVAL, CALLBACK_MAX_ATTEMPTS, admin::AnswerCallbackRequest,
    state::GatewayState, storage::CallbackAnswer,
};

/// Spawns the watcher task for one callback event.
pub fn spawn_watcher(
    state: &Arc<GatewayState>,
    query_id: String,
    raw_query_id: i64,
    peer_id: i64,
    msg_id: i64,
) {
    let state = Arc::clone(state);
    tokio::spawn(async move {
        watch(state, query_id, raw_query_id, peer_id, msg_id).await;
    });
}

async fn watch(
    state: Arc<GatewayState>,
    query_id: String,
    raw_query_id: i64,
    peer_id: i64,
    msg_id: i64,
) {
    for _ in 0..CALLBACK_MAX_ATTEMPTS {
        tokio::time::sleep(CALLBACK_CHECK_INTERVAL).await;

        let answer = match state.callbacks.get(&query_id).await {
            Ok(Some(answer)) => answer,
            Ok(None) => continue,
            Err(err) => {
                error!("failed to read callback answer {query_id}: {err}");
                continue;
            }
        };

        info!("Found answer for callback {query_id}");
        forward(&state, &query_id, raw_query_id, peer_id, msg_id, answer).await;

        return;
    }

    debug!("no answer deposited for callback {query_id}");
}

/// Posts the answer and deletes the mailbox record unconditionally; a
/// network failure here is logged, not retried.
async fn forward(
    state: &Arc<GatewayState>,
    query_id: &str,
    raw_query_id: i64,
    peer_id: i64,
    msg_id: i64,
    answer: CallbackAnswer,
) {
    let request = AnswerCallbackRequest {
        query_id: raw_query_id,
        peer_id,
        msg_id,
        alert: answer.alert,
        message: answer.message,
        url: answer.url,
        cache_time: answer.cache_time,
    };

    match state.admin.answer_callback(&request).await {
        Ok(()) => info!("Callback answer forwarded for {query_id}"),
        Err(err) => error!("failed to forward callback answer {query_id}: {err}"),
    }

    if let Err(err) = state.callbacks.delete(query_id).await {
        error!("failed to delete callback answer {query_id}: {err}");
    }
}
