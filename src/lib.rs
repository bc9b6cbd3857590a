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

//! Library of the GateBot crate.
//!
//! # Description
//!
//! GateBot exposes a subset of the public Bot HTTP API (`/bot<token>/<method>`)
//! and translates each call into operations against a self-hosted messaging
//! backend. Every bot is backed by a long-lived user-client session plus the
//! backend's administrative REST API; inbound client events are normalized
//! into Bot-API-shaped updates and served back through `getUpdates` long
//! polling.
//!
//! The request path is: HTTP surface ([`http`]) → dispatcher ([`dispatcher`])
//! → per-verb endpoints ([`endpoints`]), which compose the client registry
//! ([`client`]), the admin REST client ([`admin`]), the updates manager
//! ([`updates`]) and the durable stores ([`storage`]).

use std::time::Duration;

pub mod admin;
pub mod botfather;
pub mod configuration;
pub mod dispatcher;
pub mod errors;
pub mod http;
pub mod ingest;
pub mod reconciler;
pub mod state;
pub mod telemetry;
pub mod updates;
pub mod wire;

// Bring all the endpoints to the main context.
pub mod endpoints {
    mod answer_callback_query;
    mod delete_message;
    mod edit_message_text;
    mod get_me;
    mod get_updates;
    mod helper;
    mod send_message;

    pub use answer_callback_query::answer_callback_query;
    pub use delete_message::delete_message;
    pub use edit_message_text::edit_message_text;
    pub use get_me::get_me;
    pub use get_updates::get_updates;
    pub use send_message::send_message;
}

// Client sessions against the backend: the library seam, the framed
// transport and the per-session registry.
pub mod client {
    mod interface;
    mod keys;
    mod registry;
    mod transport;

    pub use interface::{
        CallbackEvent, ClientConnector, ClientEvent, MessageEntity, MtClient, PeerEntity, SelfUser,
    };
    pub use keys::KeyTable;
    pub use registry::ClientRegistry;
    pub use transport::{BackendConnector, SessionFile};
}

// Durable stores backing the token router and the callback-answer mailbox.
pub mod storage {
    mod callbacks;
    mod mongo;
    mod tokens;

    pub use callbacks::{CallbackAnswer, CallbackAnswerStore};
    pub use mongo::MongoStorage;
    pub use tokens::{TokenRecord, TokenStore, TokenUpdate, generate_token};
}

/// Hard cap on the number of queued updates per bot; overflow drops the
/// oldest entries.
pub const MAX_QUEUE_SIZE: usize = 1000;

/// Upper bound for the `limit` parameter of `getUpdates`.
pub const MAX_UPDATES_LIMIT: i64 = 100;

/// Upper bound, in seconds, for the `timeout` parameter of `getUpdates`.
pub const MAX_TIMEOUT: i64 = 50;

/// Timeout applied to admin REST send-message calls and to client RPCs.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout applied to the admin REST answer-callback call.
pub const CALLBACK_ANSWER_TIMEOUT: Duration = Duration::from_secs(10);

/// How many times a callback watcher polls the answer store before giving up.
pub const CALLBACK_MAX_ATTEMPTS: u32 = 20;

/// Spacing between two polls of the callback-answer store.
pub const CALLBACK_CHECK_INTERVAL: Duration = Duration::from_millis(300);

/// Delay between a raw callback event and the lookup of its original
/// message, so the backend has settled the message before it is fetched.
pub const CALLBACK_EVENT_DELAY: Duration = Duration::from_millis(100);

/// Age after which dedup keys are purged from the seen sets.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Quantum of the `getUpdates` long-poll loop.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Length of a generated bot token.
pub const TOKEN_LENGTH: usize = 45;
