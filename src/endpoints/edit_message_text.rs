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

//! Handler for the editMessageText method.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::info;

use super::helper::{message_result, required_i64, required_string};
use crate::{
    client::{MtClient, SelfUser},
    errors::GatewayError,
    wire::Params,
};

/// Editing to the identical text is a 400, matching the upstream
/// "Message is not modified" semantics.
pub async fn edit_message_text(
    client: &Arc<dyn MtClient>,
    me: &SelfUser,
    params: &Params,
) -> Result<Value, GatewayError> {
    let chat_id = required_i64(params, "chat_id")?;
    let message_id = required_i64(params, "message_id")?;
    let text = required_string(params, "text")?;

    let current = client
        .get_message(chat_id, message_id)
        .await?
        .ok_or(GatewayError::MessageNotFound)?;

    if current.text == text {
        return Err(GatewayError::MessageNotModified);
    }

    let edited = client.edit_message(chat_id, message_id, &text).await?;
    let chat = client.get_entity(chat_id).await?;

    info!("Message {message_id} edited in chat {chat_id}");

    let mut result = message_result(edited.id, me, chat_id, &chat, edited.date, &text);
    result["edit_date"] = json!(edited.edit_date.unwrap_or(edited.date));

    Ok(result)
}
