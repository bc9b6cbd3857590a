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

//! Method dispatcher.
//!
//! # Description
//!
//! Single entry point of the request path: authenticate the token, obtain
//! the bot's client session, make sure its event handlers are installed,
//! then route the lower-cased method name to its handler. Token misses,
//! storage failures and session failures all collapse into the same 401 —
//! callers learn nothing about which of them happened.

use std::sync::Arc;

use tracing::{error, warn};

use crate::{
    endpoints,
    errors::GatewayError,
    ingest,
    state::GatewayState,
    wire::{ApiResponse, Params},
};

#[tracing::instrument(name = "Process API request", skip_all, fields(method = %method))]
pub async fn process(
    state: &Arc<GatewayState>,
    token: &str,
    method: &str,
    params: &Params,
) -> ApiResponse {
    match try_process(state, token, method, params).await {
        Ok(result) => ApiResponse::success(result),
        Err(err) => {
            match err.error_code() {
                401 => warn!("request rejected: {err}"),
                500 => error!("internal error: {err}"),
                _ => warn!("bad request: {err}"),
            }

            ApiResponse::from(err)
        }
    }
}

async fn try_process(
    state: &Arc<GatewayState>,
    token: &str,
    method: &str,
    params: &Params,
) -> Result<serde_json::Value, GatewayError> {
    let record = match state.tokens.lookup(token).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            let preview: String = token.chars().take(10).collect();
            warn!("token not found: {preview}...");
            return Err(GatewayError::Unauthorized);
        }
        Err(err) => {
            error!("token lookup failed: {err}");
            return Err(GatewayError::Unauthorized);
        }
    };

    let client = match state.registry.get(&record.session_name).await {
        Ok(client) => client,
        Err(err) => {
            error!(
                "client initialization failed for {}: {err}",
                record.session_name
            );
            return Err(GatewayError::Unauthorized);
        }
    };

    let me = client
        .get_me()
        .await
        .map_err(|err| GatewayError::Internal(err.to_string()))?;
    let bot_id = me.id;

    ingest::register(state, bot_id, Arc::clone(&client));

    match method.to_lowercase().as_str() {
        "getme" => endpoints::get_me(&client).await,
        "sendmessage" => endpoints::send_message(state, &client, &me, params).await,
        "deletemessage" => endpoints::delete_message(&client, params).await,
        "editmessagetext" => endpoints::edit_message_text(&client, &me, params).await,
        "getupdates" => endpoints::get_updates(state, bot_id, params).await,
        "answercallbackquery" => endpoints::answer_callback_query(state, params).await,
        _ => {
            warn!("method not implemented: {method}");
            Err(GatewayError::UnknownMethod(method.to_owned()))
        }
    }
}
