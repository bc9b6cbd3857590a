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

//! Test harness for the gateway: a full in-process server wired to a fake
//! backend client, a recording admin REST server and in-memory stores.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use axum::{Json, Router, extract::State, routing::post};
use gatebot::{
    admin::AdminApi,
    client::{
        CallbackEvent, ClientConnector, ClientEvent, ClientRegistry, MessageEntity, MtClient,
        PeerEntity, SelfUser,
    },
    errors::{ClientError, StoreError},
    http,
    state::GatewayState,
    storage::{CallbackAnswer, CallbackAnswerStore, TokenRecord, TokenStore, TokenUpdate},
};
use once_cell::sync::Lazy;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing::{Level, subscriber::set_global_default};
use tracing_subscriber::FmtSubscriber;

static TRACING: Lazy<()> = Lazy::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let level = std::env::var("TEST_LOG").expect("Failed to read the content of TEST_LOG var");
        let level = match level.as_str() {
            "info" => Some(Level::INFO),
            "debug" => Some(Level::DEBUG),
            "warn" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            &_ => None,
        };

        if let Some(level) = level {
            let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
            set_global_default(subscriber).expect("Failed to set subscriber.");
        }
    }
});

/// In-memory stand-in for the token collection.
#[derive(Default)]
pub struct MemoryTokenStore {
    records: Mutex<Vec<TokenRecord>>,
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn lookup(&self, token: &str) -> Result<Option<TokenRecord>, StoreError> {
        let records = self.records.lock().unwrap();

        if let Some(record) = records.iter().find(|record| record.token == token) {
            return Ok(Some(record.clone()));
        }

        Ok(records
            .iter()
            .find(|record| record.full_token == token)
            .cloned())
    }

    async fn lookup_bot(&self, bot_id: i64) -> Result<Option<TokenRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|record| record.bot_id == bot_id)
            .cloned())
    }

    async fn create(&self, record: &TokenRecord) -> Result<(), StoreError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn update(&self, bot_id: i64, patch: TokenUpdate) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.iter_mut().find(|record| record.bot_id == bot_id) {
            if let Some(full_token) = patch.full_token {
                record.full_token = full_token;
            }
            if let Some(verified) = patch.verified {
                record.verified = verified;
            }
        }
        Ok(())
    }
}

/// In-memory stand-in for the callback-answer mailbox.
#[derive(Default)]
pub struct MemoryCallbackStore {
    answers: Mutex<HashMap<String, CallbackAnswer>>,
}

#[async_trait]
impl CallbackAnswerStore for MemoryCallbackStore {
    async fn put(&self, answer: &CallbackAnswer) -> Result<(), StoreError> {
        let mut answers = self.answers.lock().unwrap();
        answers.remove(&answer.query_id);
        answers.insert(answer.query_id.clone(), answer.clone());
        Ok(())
    }

    async fn get(&self, query_id: &str) -> Result<Option<CallbackAnswer>, StoreError> {
        Ok(self.answers.lock().unwrap().get(query_id).cloned())
    }

    async fn delete(&self, query_id: &str) -> Result<(), StoreError> {
        self.answers.lock().unwrap().remove(query_id);
        Ok(())
    }
}

/// Scripted client session: entities and messages are seeded by the test,
/// events are pushed through the same typed stream production uses.
pub struct FakeClient {
    pub me: SelfUser,
    connected: AtomicBool,
    entities: Mutex<HashMap<i64, PeerEntity>>,
    messages: Mutex<HashMap<(i64, i64), MessageEntity>>,
    pub deleted: Mutex<Vec<(i64, i64)>>,
    events: broadcast::Sender<ClientEvent>,
}

impl FakeClient {
    pub fn new(me: SelfUser) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);

        Arc::new(FakeClient {
            me,
            connected: AtomicBool::new(true),
            entities: Mutex::new(HashMap::new()),
            messages: Mutex::new(HashMap::new()),
            deleted: Mutex::new(Vec::new()),
            events,
        })
    }

    pub fn seed_entity(&self, entity: PeerEntity) {
        self.entities.lock().unwrap().insert(entity.id, entity);
    }

    pub fn seed_message(&self, message: MessageEntity) {
        self.messages
            .lock()
            .unwrap()
            .insert((message.chat_id, message.id), message);
    }

    pub fn push_message(&self, message: MessageEntity) {
        self.events
            .send(ClientEvent::NewMessage(message))
            .expect("no ingest subscriber; dispatch a request first");
    }

    pub fn push_callback(&self, query: CallbackEvent) {
        self.events
            .send(ClientEvent::CallbackQuery(query))
            .expect("no ingest subscriber; dispatch a request first");
    }
}

#[async_trait]
impl MtClient for FakeClient {
    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn is_authorized(&self) -> Result<bool, ClientError> {
        Ok(true)
    }

    async fn get_me(&self) -> Result<SelfUser, ClientError> {
        Ok(self.me.clone())
    }

    async fn get_entity(&self, peer_id: i64) -> Result<PeerEntity, ClientError> {
        self.entities
            .lock()
            .unwrap()
            .get(&peer_id)
            .cloned()
            .ok_or_else(|| ClientError::Transport(format!("unknown peer {peer_id}")))
    }

    async fn get_message(
        &self,
        chat_id: i64,
        message_id: i64,
    ) -> Result<Option<MessageEntity>, ClientError> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .get(&(chat_id, message_id))
            .cloned())
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<MessageEntity, ClientError> {
        let mut messages = self.messages.lock().unwrap();
        let message = messages
            .get_mut(&(chat_id, message_id))
            .ok_or_else(|| ClientError::Transport(String::from("message to edit not found")))?;

        message.text = text.to_owned();
        message.edit_date = Some(message.date + 5);

        Ok(message.clone())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), ClientError> {
        self.messages.lock().unwrap().remove(&(chat_id, message_id));
        self.deleted.lock().unwrap().push((chat_id, message_id));
        Ok(())
    }

    async fn sync_state(&self) -> Result<(), ClientError> {
        Ok(())
    }

    async fn catch_up(&self) -> Result<(), ClientError> {
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
    }
}

pub struct FakeConnector {
    pub client: Arc<FakeClient>,
}

#[async_trait]
impl ClientConnector for FakeConnector {
    async fn connect(
        &self,
        _session_name: &str,
        _session_path: &std::path::Path,
    ) -> Result<Arc<dyn MtClient>, ClientError> {
        Ok(Arc::clone(&self.client) as Arc<dyn MtClient>)
    }
}

/// Recording stand-in for the backend admin REST API.
#[derive(Default)]
pub struct AdminRecorder {
    pub send_messages: Mutex<Vec<Value>>,
    pub answers: Mutex<Vec<Value>>,
}

async fn record_send_message(
    State(recorder): State<Arc<AdminRecorder>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    recorder.send_messages.lock().unwrap().push(body);

    Json(json!({ "messageId": 777 }))
}

async fn record_answer_callback(
    State(recorder): State<Arc<AdminRecorder>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    recorder.answers.lock().unwrap().push(body);

    Json(json!({}))
}

async fn spawn_admin(recorder: Arc<AdminRecorder>) -> SocketAddr {
    let app = Router::new()
        .route("/send-message", post(record_send_message))
        .route("/answer-callback", post(record_answer_callback))
        .with_state(recorder);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind the fake admin server.");
    let addr = listener.local_addr().expect("Failed to read the bound address.");

    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("Fake admin server died.");
    });

    addr
}

pub struct TestApp {
    pub address: String,
    pub http: reqwest::Client,
    pub client: Arc<FakeClient>,
    pub admin: Arc<AdminRecorder>,
    pub callbacks: Arc<MemoryCallbackStore>,
}

impl TestApp {
    /// Bot id of the seeded test bot.
    pub const BOT_ID: i64 = 123;
    /// Full token routed to the seeded test bot.
    pub const TOKEN: &'static str = "123:abc";

    pub fn url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.address, Self::TOKEN)
    }

    pub async fn get_json(&self, method_and_query: &str) -> (reqwest::StatusCode, Value) {
        let response = self
            .http
            .get(format!(
                "{}/bot{}/{method_and_query}",
                self.address,
                Self::TOKEN
            ))
            .send()
            .await
            .expect("request failed");
        let status = response.status();
        let body = response.json().await.expect("response was not JSON");

        (status, body)
    }

    pub async fn post_json(&self, method: &str, body: Value) -> (reqwest::StatusCode, Value) {
        let response = self
            .http
            .post(self.url(method))
            .json(&body)
            .send()
            .await
            .expect("request failed");
        let status = response.status();
        let body = response.json().await.expect("response was not JSON");

        (status, body)
    }

    /// Dispatches a `getMe` so the bot's event handlers are installed
    /// before a test pushes client events.
    pub async fn prime(&self) {
        let (status, body) = self.get_json("getMe").await;

        assert!(status.is_success());
        assert_eq!(body["ok"], json!(true));
    }

    /// Polls `getUpdates` without long-poll timeout until `least` updates
    /// arrive or ~3 seconds pass.
    pub async fn wait_for_updates(&self, offset: i64, least: usize) -> Vec<Value> {
        for _ in 0..30 {
            let (_, body) = self
                .get_json(&format!("getUpdates?offset={offset}&timeout=0"))
                .await;
            let updates = body["result"].as_array().cloned().unwrap_or_default();
            if updates.len() >= least {
                return updates;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }

        panic!("expected at least {least} updates, the queue never filled");
    }
}

pub async fn spawn_app() -> TestApp {
    Lazy::force(&TRACING);

    let me = SelfUser {
        id: TestApp::BOT_ID,
        is_bot: true,
        first_name: String::from("Gate Test"),
        username: String::from("gatetest_bot"),
    };
    let client = FakeClient::new(me);

    // A private chat partner every test can talk to.
    client.seed_entity(PeerEntity {
        id: 42,
        first_name: Some(String::from("Ana")),
        username: Some(String::from("ana")),
        lang_code: Some(String::from("es")),
        is_bot: false,
        premium: false,
    });

    let admin = Arc::new(AdminRecorder::default());
    let admin_addr = spawn_admin(Arc::clone(&admin)).await;

    let tokens = Arc::new(MemoryTokenStore::default());
    tokens
        .create(&TokenRecord {
            token: String::from("abc"),
            full_token: String::from(TestApp::TOKEN),
            bot_id: TestApp::BOT_ID,
            session_name: String::from("bot_123"),
            bot_username: String::from("gatetest_bot"),
            bot_name: String::from("Gate Test"),
            owner_id: 1,
            verified: true,
            created_at: 1700000000,
        })
        .await
        .expect("failed to seed the token record");

    let callbacks = Arc::new(MemoryCallbackStore::default());
    let registry = ClientRegistry::new(
        Arc::new(FakeConnector {
            client: Arc::clone(&client),
        }),
        std::env::temp_dir(),
    );

    let state = Arc::new(GatewayState::new(
        "Bot API Server",
        Arc::clone(&tokens) as Arc<dyn TokenStore>,
        Arc::clone(&callbacks) as Arc<dyn CallbackAnswerStore>,
        registry,
        AdminApi::new(format!("http://{admin_addr}")),
    ));

    let app = http::router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind the gateway server.");
    let address = format!("http://{}", listener.local_addr().expect("no local addr"));

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Gateway server died.");
    });

    TestApp {
        address,
        http: reqwest::Client::new(),
        client,
        admin,
        callbacks,
    }
}
