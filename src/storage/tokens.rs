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

//! Token router records.
//!
//! # Description
//!
//! A [`TokenRecord`] is the durable mapping between a bearer token presented
//! in the URL and the bot identity plus client session that serve it. The
//! record is created exactly once per bot and is the sole source of truth
//! for authenticating HTTP requests: a lookup miss (or a storage failure,
//! deliberately indistinguishable at the API boundary) means 401.

use async_trait::async_trait;
use chrono::Utc;
use rand::{Rng, distr::Alphanumeric};
use serde::{Deserialize, Serialize};

use crate::{TOKEN_LENGTH, errors::StoreError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenRecord {
    /// Opaque 45-char alphanumeric secret.
    pub token: String,
    /// `"<bot_id>:<token>"`, the form callers embed in the URL.
    #[serde(default)]
    pub full_token: String,
    pub bot_id: i64,
    /// Stable name of the client session backing this bot.
    pub session_name: String,
    pub bot_username: String,
    pub bot_name: String,
    pub owner_id: i64,
    pub verified: bool,
    /// Unix seconds.
    pub created_at: i64,
}

impl TokenRecord {
    /// Mints a record with a freshly generated token.
    pub fn issue(
        bot_id: i64,
        session_name: &str,
        bot_username: &str,
        bot_name: &str,
        owner_id: i64,
    ) -> Self {
        let token = generate_token(TOKEN_LENGTH);
        let full_token = format!("{bot_id}:{token}");

        TokenRecord {
            token,
            full_token,
            bot_id,
            session_name: session_name.to_owned(),
            bot_username: bot_username.to_owned(),
            bot_name: bot_name.to_owned(),
            owner_id,
            verified: false,
            created_at: Utc::now().timestamp(),
        }
    }
}

/// Partial update applied by [`TokenStore::update`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenUpdate {
    pub full_token: Option<String>,
    pub verified: Option<bool>,
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Exact match on `token` first, then on `full_token`.
    async fn lookup(&self, token: &str) -> Result<Option<TokenRecord>, StoreError>;

    /// Lookup by the bot identity a token authenticates as.
    async fn lookup_bot(&self, bot_id: i64) -> Result<Option<TokenRecord>, StoreError>;

    /// Inserts a record; the caller guarantees uniqueness of
    /// `(bot_id, token)` and `full_token`.
    async fn create(&self, record: &TokenRecord) -> Result<(), StoreError>;

    /// Partial update by `bot_id`.
    async fn update(&self, bot_id: i64, patch: TokenUpdate) -> Result<(), StoreError>;
}

/// Samples an alphanumeric secret of the given length.
pub fn generate_token(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
