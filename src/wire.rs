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

//! Bot API wire shapes.
//!
//! # Description
//!
//! The JSON bodies external callers see: the `{ok, result, error_code,
//! description}` envelope, the canonical user/chat objects, and the tagged
//! [`Update`] union (`message` or `callback_query`). These shapes are the
//! compatibility contract; field names and casing must stay exactly as the
//! upstream Bot API defines them.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    client::{PeerEntity, SelfUser},
    errors::GatewayError,
};

/// Parameters of a single API call, extracted from the query string, form
/// fields or JSON body.
pub type Params = serde_json::Map<String, Value>;

/// Response envelope wrapping every API result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ApiResponse {
    pub fn success(result: Value) -> Self {
        ApiResponse {
            ok: true,
            result: Some(result),
            error_code: None,
            description: None,
        }
    }

    pub fn failure(error_code: u16, description: impl Into<String>) -> Self {
        ApiResponse {
            ok: false,
            result: None,
            error_code: Some(error_code),
            description: Some(description.into()),
        }
    }
}

impl From<GatewayError> for ApiResponse {
    fn from(err: GatewayError) -> Self {
        ApiResponse::failure(err.error_code(), err.to_string())
    }
}

// Protocol-level failures still travel as HTTP 200; only an unauthorized
// token maps to a 401 status. Unrouted paths get their 404 at the router.
impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let status = match self.error_code {
            Some(401) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::OK,
        };

        (status, Json(self)).into_response()
    }
}

/// Canonical Bot API user object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_premium: Option<bool>,
}

impl ApiUser {
    /// Full mapping used by update payloads, with the historical `ru`
    /// fallback when the backend reports no language code.
    pub fn from_peer(peer: &PeerEntity) -> Self {
        ApiUser {
            id: peer.id,
            is_bot: peer.is_bot,
            first_name: peer.first_name.clone().unwrap_or_default(),
            username: peer.username.clone().unwrap_or_default(),
            language_code: Some(
                peer.lang_code
                    .clone()
                    .unwrap_or_else(|| String::from("ru")),
            ),
            is_premium: Some(peer.premium),
        }
    }

    /// Short mapping used for the `from` field of outbound messages.
    pub fn from_self(me: &SelfUser) -> Self {
        ApiUser {
            id: me.id,
            is_bot: me.is_bot,
            first_name: me.first_name.clone(),
            username: me.username.clone(),
            language_code: None,
            is_premium: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
}

impl ChatKind {
    /// A peer that carries a first name is a person, i.e. a private chat.
    pub fn from_first_name(first_name: Option<&str>) -> Self {
        if first_name.is_some() {
            ChatKind::Private
        } else {
            ChatKind::Group
        }
    }
}

/// Chat object of a message update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiChat {
    pub id: i64,
    pub first_name: String,
    pub username: String,
    #[serde(rename = "type")]
    pub kind: ChatKind,
}

/// Reduced chat object nested in a callback query's message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallbackChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ChatKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessagePayload {
    pub message_id: i64,
    pub from: ApiUser,
    pub chat: ApiChat,
    /// Unix seconds.
    pub date: i64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallbackMessage {
    pub message_id: i64,
    pub date: i64,
    pub chat: CallbackChat,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallbackPayload {
    pub id: String,
    pub from: ApiUser,
    pub message: CallbackMessage,
    pub chat_instance: String,
    pub data: String,
}

/// One normalized inbound event, tagged by its single key in the serialized
/// form: `{"update_id": …, "message": …}` or
/// `{"update_id": …, "callback_query": …}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Update {
    pub update_id: i64,
    #[serde(flatten)]
    pub kind: UpdateKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum UpdateKind {
    #[serde(rename = "message")]
    Message(MessagePayload),
    #[serde(rename = "callback_query")]
    CallbackQuery(CallbackPayload),
}
