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

//! Production storage backend over the backend's document store.

use async_trait::async_trait;
use mongodb::{Client, Collection, Database, bson::doc};
use tracing::{debug, info};

use crate::{
    errors::StoreError,
    storage::{CallbackAnswer, CallbackAnswerStore, TokenRecord, TokenStore, TokenUpdate},
};

/// Database used when the connection string names none.
const DEFAULT_DATABASE: &str = "tg";

/// Mongo-backed implementation of both durable stores.
#[derive(Clone)]
pub struct MongoStorage {
    tokens: Collection<TokenRecord>,
    callback_answers: Collection<CallbackAnswer>,
}

impl MongoStorage {
    pub async fn connect(uri: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        let db = client
            .default_database()
            .unwrap_or_else(|| client.database(DEFAULT_DATABASE));

        info!("Connected to the {} database", db.name());

        Ok(Self::with_database(&db))
    }

    pub fn with_database(db: &Database) -> Self {
        MongoStorage {
            tokens: db.collection("tokens"),
            callback_answers: db.collection("callback_answers"),
        }
    }
}

#[async_trait]
impl TokenStore for MongoStorage {
    async fn lookup(&self, token: &str) -> Result<Option<TokenRecord>, StoreError> {
        if let Some(record) = self.tokens.find_one(doc! { "token": token }).await? {
            return Ok(Some(record));
        }

        Ok(self
            .tokens
            .find_one(doc! { "full_token": token })
            .await?)
    }

    async fn lookup_bot(&self, bot_id: i64) -> Result<Option<TokenRecord>, StoreError> {
        Ok(self.tokens.find_one(doc! { "bot_id": bot_id }).await?)
    }

    async fn create(&self, record: &TokenRecord) -> Result<(), StoreError> {
        self.tokens.insert_one(record).await?;

        info!("Created token for bot {}", record.bot_id);

        Ok(())
    }

    async fn update(&self, bot_id: i64, patch: TokenUpdate) -> Result<(), StoreError> {
        let mut set = doc! {};

        if let Some(full_token) = patch.full_token {
            set.insert("full_token", full_token);
        }
        if let Some(verified) = patch.verified {
            set.insert("verified", verified);
        }

        if set.is_empty() {
            return Ok(());
        }

        self.tokens
            .update_one(doc! { "bot_id": bot_id }, doc! { "$set": set })
            .await?;

        Ok(())
    }
}

#[async_trait]
impl CallbackAnswerStore for MongoStorage {
    async fn put(&self, answer: &CallbackAnswer) -> Result<(), StoreError> {
        self.callback_answers
            .delete_many(doc! { "query_id": &answer.query_id })
            .await?;
        self.callback_answers.insert_one(answer).await?;

        debug!("Stored callback answer for query {}", answer.query_id);

        Ok(())
    }

    async fn get(&self, query_id: &str) -> Result<Option<CallbackAnswer>, StoreError> {
        Ok(self
            .callback_answers
            .find_one(doc! { "query_id": query_id })
            .await?)
    }

    async fn delete(&self, query_id: &str) -> Result<(), StoreError> {
        self.callback_answers
            .delete_one(doc! { "query_id": query_id })
            .await?;

        Ok(())
    }
}
