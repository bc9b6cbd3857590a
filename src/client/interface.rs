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

//! Interface of the backend user-client library.
//!
//! # Description
//!
//! The gateway drives the messaging backend through long-lived user-client
//! sessions. The transport behind those sessions is a black box to the rest
//! of the crate; everything upstream of it programs against [`MtClient`] and
//! obtains connected instances through a [`ClientConnector`]. Incoming
//! traffic arrives as a typed [`ClientEvent`] stream, so consumers never
//! branch on raw wire frames.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::errors::ClientError;

/// The bot's own account as the backend reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct SelfUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub username: String,
}

/// A user or chat peer resolved by the client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeerEntity {
    pub id: i64,
    pub first_name: Option<String>,
    pub username: Option<String>,
    pub lang_code: Option<String>,
    pub is_bot: bool,
    pub premium: bool,
}

/// A message as the client session sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEntity {
    pub id: i64,
    pub chat_id: i64,
    pub sender_id: i64,
    /// Unix seconds.
    pub date: i64,
    pub edit_date: Option<i64>,
    pub text: String,
    /// Whether the session's own account sent this message.
    pub outgoing: bool,
}

/// A pressed inline-keyboard button, before the original message has been
/// resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackEvent {
    pub query_id: i64,
    pub user_id: i64,
    /// The peer chat the button lives in.
    pub chat_id: i64,
    pub msg_id: i64,
    pub data: Vec<u8>,
}

/// Typed subscription stream of a client session.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    NewMessage(MessageEntity),
    CallbackQuery(CallbackEvent),
}

#[async_trait]
pub trait MtClient: Send + Sync {
    async fn is_connected(&self) -> bool;

    async fn is_authorized(&self) -> Result<bool, ClientError>;

    async fn get_me(&self) -> Result<SelfUser, ClientError>;

    async fn get_entity(&self, peer_id: i64) -> Result<PeerEntity, ClientError>;

    async fn get_message(
        &self,
        chat_id: i64,
        message_id: i64,
    ) -> Result<Option<MessageEntity>, ClientError>;

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<MessageEntity, ClientError>;

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), ClientError>;

    /// Best-effort fetch of the backend's update state cursor.
    async fn sync_state(&self) -> Result<(), ClientError>;

    /// Replays updates missed while the session was offline.
    async fn catch_up(&self) -> Result<(), ClientError>;

    fn subscribe(&self) -> broadcast::Receiver<ClientEvent>;

    async fn disconnect(&self);
}

#[async_trait]
pub trait ClientConnector: Send + Sync {
    /// Opens a client bound to the session file at `session_path`.
    async fn connect(
        &self,
        session_name: &str,
        session_path: &Path,
    ) -> Result<Arc<dyn MtClient>, ClientError>;
}
