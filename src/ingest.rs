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

//! Event ingest: from client events to queued updates.
//!
//! # Description
//!
//! On the first dispatched request of a bot, the dispatcher installs one
//! ingest task over the client's typed event stream. Incoming messages and
//! pressed buttons are filtered (own traffic, duplicates, empty content),
//! resolved against the client, normalized into Bot-API update payloads and
//! appended to the bot's queue. A callback event additionally spawns a
//! reconciler watcher for its `query_id`.
//!
//! Ingest failures are logged and the event is dropped; they never surface
//! to an API caller.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::{
    CALLBACK_EVENT_DELAY,
    client::{CallbackEvent, ClientEvent, MessageEntity, MtClient},
    reconciler,
    state::GatewayState,
    wire::{
        ApiChat, ApiUser, CallbackChat, CallbackMessage, CallbackPayload, ChatKind,
        MessagePayload, UpdateKind,
    },
};

/// Installs the event subscription for a bot. Idempotent: only the first
/// call per bot spawns the task; the subscription is taken synchronously so
/// no event published after this call returns can be missed.
pub fn register(state: &Arc<GatewayState>, bot_id: i64, client: Arc<dyn MtClient>) {
    if !state.updates.try_register_handlers(bot_id) {
        return;
    }

    info!("Registering event handlers for bot {bot_id}");

    let events = client.subscribe();
    let state = Arc::clone(state);
    tokio::spawn(run(state, bot_id, client, events));
}

async fn run(
    state: Arc<GatewayState>,
    bot_id: i64,
    client: Arc<dyn MtClient>,
    mut events: broadcast::Receiver<ClientEvent>,
) {
    loop {
        match events.recv().await {
            Ok(ClientEvent::NewMessage(message)) => {
                handle_message(&state, bot_id, &client, message).await;
            }
            Ok(ClientEvent::CallbackQuery(query)) => {
                handle_callback(&state, bot_id, &client, query).await;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("event stream of bot {bot_id} lagged, {skipped} events skipped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }

    debug!("event stream of bot {bot_id} closed");
}

async fn handle_message(
    state: &Arc<GatewayState>,
    bot_id: i64,
    client: &Arc<dyn MtClient>,
    message: MessageEntity,
) {
    if message.outgoing || message.sender_id == bot_id {
        return;
    }

    let msg_key = format!("{}_{}", message.chat_id, message.id);
    if !state.updates.register_message_key(bot_id, &msg_key) {
        return;
    }

    if message.text.is_empty() {
        return;
    }

    let sender = match client.get_entity(message.sender_id).await {
        Ok(sender) => sender,
        Err(err) => {
            error!("failed to resolve sender {}: {err}", message.sender_id);
            return;
        }
    };
    let chat = match client.get_entity(message.chat_id).await {
        Ok(chat) => chat,
        Err(err) => {
            error!("failed to resolve chat {}: {err}", message.chat_id);
            return;
        }
    };

    let update = UpdateKind::Message(MessagePayload {
        message_id: message.id,
        from: ApiUser::from_peer(&sender),
        chat: ApiChat {
            id: message.chat_id,
            first_name: chat.first_name.clone().unwrap_or_default(),
            username: chat.username.clone().unwrap_or_default(),
            kind: ChatKind::from_first_name(chat.first_name.as_deref()),
        },
        date: message.date,
        text: message.text.clone(),
    });

    let update_id = state.updates.add(bot_id, update);
    info!(
        "Message update {update_id} queued for bot {bot_id}: {:.50}",
        message.text
    );
}

async fn handle_callback(
    state: &Arc<GatewayState>,
    bot_id: i64,
    client: &Arc<dyn MtClient>,
    query: CallbackEvent,
) {
    if query.user_id == bot_id {
        return;
    }

    let data = match String::from_utf8(query.data.clone()) {
        Ok(data) => data,
        Err(_) => {
            warn!("callback data of query {} is not valid UTF-8", query.query_id);
            return;
        }
    };

    let callback_key = format!("cb_{}_{}_{}", query.user_id, query.msg_id, data);
    if !state.updates.register_callback_key(bot_id, &callback_key) {
        return;
    }

    // Give the backend a beat to settle the message the button lives on.
    tokio::time::sleep(CALLBACK_EVENT_DELAY).await;

    let sender = match client.get_entity(query.user_id).await {
        Ok(sender) => sender,
        Err(err) => {
            error!("failed to resolve callback sender {}: {err}", query.user_id);
            return;
        }
    };
    let original = match client.get_message(query.chat_id, query.msg_id).await {
        Ok(Some(message)) => message,
        Ok(None) => {
            warn!("original message {} of callback not found", query.msg_id);
            return;
        }
        Err(err) => {
            error!("failed to fetch original message {}: {err}", query.msg_id);
            return;
        }
    };
    let chat = match client.get_entity(original.chat_id).await {
        Ok(chat) => chat,
        Err(err) => {
            error!("failed to resolve chat {}: {err}", original.chat_id);
            return;
        }
    };

    let query_id = query.query_id.to_string();
    let update = UpdateKind::CallbackQuery(CallbackPayload {
        id: query_id.clone(),
        from: ApiUser::from_peer(&sender),
        message: CallbackMessage {
            message_id: original.id,
            date: original.date,
            chat: CallbackChat {
                id: original.chat_id,
                kind: ChatKind::from_first_name(chat.first_name.as_deref()),
            },
            text: original.text.clone(),
        },
        chat_instance: format!("{}_{}", query.chat_id, Utc::now().timestamp()),
        data,
    });

    let update_id = state.updates.add(bot_id, update);
    info!("Callback update {update_id} queued for bot {bot_id}, query_id: {query_id}");

    reconciler::spawn_watcher(state, query_id, query.query_id, query.user_id, query.msg_id);
}
