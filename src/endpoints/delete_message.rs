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

//! Handler for the deleteMessage method.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use super::helper::required_i64;
use crate::{client::MtClient, errors::GatewayError, wire::Params};

pub async fn delete_message(
    client: &Arc<dyn MtClient>,
    params: &Params,
) -> Result<Value, GatewayError> {
    let chat_id = required_i64(params, "chat_id")?;
    let message_id = required_i64(params, "message_id")?;

    client.delete_message(chat_id, message_id).await?;

    info!("Message {message_id} deleted in chat {chat_id}");

    Ok(Value::Bool(true))
}
