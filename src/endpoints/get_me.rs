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

//! Handler for the getMe method.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::info;

use crate::{client::MtClient, errors::GatewayError};

/// Identity of the bot plus the fixed capability flags of a gateway bot.
/// A probe failure here means the session died mid-request, which is an
/// internal error rather than a client mistake.
pub async fn get_me(client: &Arc<dyn MtClient>) -> Result<Value, GatewayError> {
    let me = client
        .get_me()
        .await
        .map_err(|err| GatewayError::Internal(err.to_string()))?;

    info!("Method getMe requested by bot {}", me.id);

    Ok(json!({
        "id": me.id,
        "is_bot": me.is_bot,
        "first_name": me.first_name,
        "username": me.username,
        "can_join_groups": true,
        "can_read_all_group_messages": false,
        "supports_inline_queries": false,
        "can_connect_to_business": false,
        "has_main_web_app": false,
    }))
}
