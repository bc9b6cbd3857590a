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

//! Custom error types.
//!
//! # Description
//!
//! Three layers of errors live here:
//!
//! - [`StoreError`] and [`ClientError`] are internal: storage backend and
//!   client transport failures.
//! - [`AdminError`] covers the backend's administrative REST API.
//! - [`GatewayError`] is the wire taxonomy of the Bot API surface. Its
//!   display string becomes the `description` field of the response
//!   envelope, and [`GatewayError::error_code`] the `error_code` field.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(#[from] mongodb::error::Error),
    #[error("malformed stored record: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("session is not authorized")]
    NotAuthorized,
    #[error("client is disconnected")]
    Disconnected,
    #[error("request to the backend timed out")]
    Timeout,
    #[error("session file error: {0}")]
    Session(String),
    #[error("client transport error: {0}")]
    Transport(String),
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    /// The backend answered with a non-success status; the body travels
    /// verbatim into the `description` of the 400 envelope.
    #[error("{body}")]
    Rejected { status: u16, body: String },
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Missing required parameters")]
    MissingParameters,
    #[error("Missing callback_query_id")]
    MissingCallbackQueryId,
    #[error("Message not found")]
    MessageNotFound,
    #[error("Message is not modified")]
    MessageNotModified,
    #[error("Bot can't send messages to itself")]
    SelfMessage,
    #[error("Method '{0}' not implemented")]
    UnknownMethod(String),
    /// The backend rejected the underlying operation (bad entity, refused
    /// admin call, client RPC failure).
    #[error("{0}")]
    Rejected(String),
    #[error("{0}")]
    Internal(String),
}

impl GatewayError {
    /// Numeric code surfaced in the response envelope.
    pub fn error_code(&self) -> u16 {
        match self {
            GatewayError::Unauthorized => 401,
            GatewayError::Internal(_) => 500,
            _ => 400,
        }
    }
}

// Client failures inside a method body surface as a 400 with the failure as
// description; token/session failures are collapsed to 401 by the
// dispatcher before a method ever runs.
impl From<ClientError> for GatewayError {
    fn from(err: ClientError) -> Self {
        GatewayError::Rejected(err.to_string())
    }
}

impl From<AdminError> for GatewayError {
    fn from(err: AdminError) -> Self {
        GatewayError::Rejected(err.to_string())
    }
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        GatewayError::Internal(err.to_string())
    }
}
