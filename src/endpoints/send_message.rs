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

//! Handler for the sendMessage method.
//!
//! # Description
//!
//! The outbound hop goes through the backend's admin REST rather than the
//! client session: the gateway resolves the target entity with the client,
//! translates an optional inline keyboard, posts `/send-message`, and echoes
//! a canonical message object whose `message_id` comes from the admin
//! response.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::info;

use super::helper::{coerce_bool, coerce_i64, inline_keyboard, message_result, required_string};
use crate::{
    admin::SendMessageRequest,
    client::{MtClient, SelfUser},
    errors::GatewayError,
    state::GatewayState,
    wire::Params,
};

#[tracing::instrument(name = "sendMessage", skip_all, fields(bot_id = me.id))]
pub async fn send_message(
    state: &GatewayState,
    client: &Arc<dyn MtClient>,
    me: &SelfUser,
    params: &Params,
) -> Result<Value, GatewayError> {
    let chat_id_raw = params
        .get("chat_id")
        .ok_or(GatewayError::MissingParameters)?;
    let text = required_string(params, "text")?;
    let chat_id = coerce_i64(chat_id_raw)
        .ok_or_else(|| GatewayError::Rejected(String::from("invalid chat_id")))?;

    if chat_id == me.id {
        return Err(GatewayError::SelfMessage);
    }

    let chat = client.get_entity(chat_id).await?;

    let keyboard = match params.get("reply_markup") {
        Some(markup) => inline_keyboard(markup)?,
        None => None,
    };
    let silent = params
        .get("disable_notification")
        .and_then(coerce_bool)
        .unwrap_or(false);

    let request = SendMessageRequest {
        from_user_id: me.id,
        to_user_id: chat_id,
        message: text.clone(),
        silent,
        buttons: keyboard.as_ref().map(|keyboard| keyboard.rows.clone()),
    };
    let response = state.admin.send_message(&request).await?;

    // The backend assigns the real id; fall back to the clock if it ever
    // omits one.
    let message_id = response
        .message_id
        .unwrap_or_else(|| Utc::now().timestamp());

    info!("Message {message_id} sent to chat {chat_id}");

    let mut result = message_result(message_id, me, chat_id, &chat, Utc::now().timestamp(), &text);
    if let Some(keyboard) = keyboard {
        result["reply_markup"] = keyboard.echo;
    }

    Ok(result)
}
