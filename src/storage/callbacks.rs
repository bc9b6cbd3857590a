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

//! Callback-answer mailbox.
//!
//! # Description
//!
//! Short-lived durable records keyed by `query_id`. The store is the
//! rendezvous point between `answerCallbackQuery` (a synchronous HTTP
//! handler depositing the answer) and the reconciler watcher that forwards
//! it to the backend: the watcher deletes the record once forwarded.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallbackAnswer {
    /// Stringified id of the callback event being answered.
    pub query_id: String,
    pub alert: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    pub cache_time: i64,
    /// Unix seconds.
    pub created_at: i64,
}

#[async_trait]
pub trait CallbackAnswerStore: Send + Sync {
    /// Idempotent by `query_id`: any previous record for the same id is
    /// replaced (delete then insert).
    async fn put(&self, answer: &CallbackAnswer) -> Result<(), StoreError>;

    async fn get(&self, query_id: &str) -> Result<Option<CallbackAnswer>, StoreError>;

    /// No-op when the record is absent.
    async fn delete(&self, query_id: &str) -> Result<(), StoreError>;
}
