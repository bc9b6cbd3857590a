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

//! Framed transport to the backend data center.
//!
//! # Description
//!
//! The shipped implementation of the client library seam. One TCP
//! connection per session carries newline-delimited JSON frames in both
//! directions: requests are correlated with responses by a numeric id, and
//! unsolicited server frames (new messages, pressed buttons) are decoded
//! into the typed [`ClientEvent`] stream. Authorization state lives in a
//! JSON session file next to the other sessions; the MTProto-level
//! handshake itself is the backend library's concern, abstracted behind the
//! `session.init` exchange that presents the installed key fingerprints.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex as StdMutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::{Mutex, broadcast, oneshot},
};
use tracing::{debug, error, warn};

use crate::{
    REQUEST_TIMEOUT,
    client::{
        CallbackEvent, ClientConnector, ClientEvent, KeyTable, MessageEntity, MtClient,
        PeerEntity, SelfUser,
    },
    errors::ClientError,
};

/// Capacity of the per-client event fan-out channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// On-disk session state. Created empty on first use; a session without an
/// authorization key is unusable until the account is signed in externally.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionFile {
    #[serde(default)]
    pub bot_id: Option<i64>,
    #[serde(default)]
    pub auth_key: Option<String>,
    #[serde(default)]
    pub dc: Option<String>,
}

impl SessionFile {
    pub fn load_or_create(path: &Path) -> Result<Self, ClientError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => {
                serde_json::from_str(&raw).map_err(|err| ClientError::Session(err.to_string()))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(SessionFile::default()),
            Err(err) => Err(ClientError::Session(err.to_string())),
        }
    }

    pub fn store(&self, path: &Path) -> Result<(), ClientError> {
        let raw = serde_json::to_string_pretty(self)
            .map_err(|err| ClientError::Session(err.to_string()))?;

        std::fs::write(path, raw).map_err(|err| ClientError::Session(err.to_string()))
    }

    pub fn is_authorized(&self) -> bool {
        self.auth_key.is_some()
    }
}

/// Connector configured for the backend data-center endpoint.
pub struct BackendConnector {
    domain: String,
    port: u16,
    api_id: i32,
    api_hash: String,
    keys: KeyTable,
}

impl BackendConnector {
    pub fn new(
        domain: impl Into<String>,
        port: u16,
        api_id: i32,
        api_hash: impl Into<String>,
        keys: KeyTable,
    ) -> Self {
        BackendConnector {
            domain: domain.into(),
            port,
            api_id,
            api_hash: api_hash.into(),
            keys,
        }
    }
}

#[async_trait]
impl ClientConnector for BackendConnector {
    async fn connect(
        &self,
        session_name: &str,
        session_path: &Path,
    ) -> Result<Arc<dyn MtClient>, ClientError> {
        let session = SessionFile::load_or_create(session_path)?;
        let stream = TcpStream::connect((self.domain.as_str(), self.port)).await?;
        let (read_half, write_half) = stream.into_split();

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let client = Arc::new(BackendClient {
            session_name: session_name.to_owned(),
            session_path: session_path.to_owned(),
            session: StdMutex::new(session.clone()),
            writer: Mutex::new(write_half),
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            connected: AtomicBool::new(true),
            events,
        });

        tokio::spawn(read_loop(Arc::clone(&client), read_half));

        let init = client
            .request(
                "session.init",
                json!({
                    "session": session_name,
                    "apiId": self.api_id,
                    "apiHash": self.api_hash,
                    "authKey": session.auth_key,
                    "keyFingerprints": self.keys.fingerprints(),
                }),
            )
            .await;
        let init = match init {
            Ok(init) => init,
            Err(err) => {
                client.disconnect().await;
                return Err(err);
            }
        };
        client.absorb_identity(&init);

        debug!("transport established for session {session_name}");

        Ok(client)
    }
}

/// A live session over the framed transport.
pub struct BackendClient {
    session_name: String,
    session_path: PathBuf,
    session: StdMutex<SessionFile>,
    writer: Mutex<OwnedWriteHalf>,
    pending: Mutex<HashMap<u64, oneshot::Sender<Result<Value, ClientError>>>>,
    next_id: AtomicU64,
    connected: AtomicBool,
    events: broadcast::Sender<ClientEvent>,
}

impl BackendClient {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(ClientError::Disconnected);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let frame = serde_json::to_string(&json!({
            "id": id,
            "method": method,
            "params": params,
        }))
        .map_err(|err| ClientError::Transport(err.to_string()))?;

        let write = async {
            let mut writer = self.writer.lock().await;
            writer.write_all(frame.as_bytes()).await?;
            writer.write_all(b"\n").await?;

            Ok::<(), std::io::Error>(())
        };

        if let Err(err) = write.await {
            self.pending.lock().await.remove(&id);
            return Err(err.into());
        }

        match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ClientError::Disconnected),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(ClientError::Timeout)
            }
        }
    }

    /// Records the bound account reported by the handshake in the session
    /// file, so later cold starts know the identity without a round trip.
    fn absorb_identity(&self, init: &Value) {
        let Some(user_id) = init.get("userId").and_then(Value::as_i64) else {
            return;
        };

        let mut session = self.session.lock().expect("session lock poisoned");
        if session.bot_id != Some(user_id) {
            session.bot_id = Some(user_id);
            if let Err(err) = session.store(&self.session_path) {
                warn!(
                    "failed to persist session {}: {err}",
                    self.session_name
                );
            }
        }
    }

    fn session_authorized(&self) -> bool {
        self.session
            .lock()
            .expect("session lock poisoned")
            .is_authorized()
    }
}

#[async_trait]
impl MtClient for BackendClient {
    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn is_authorized(&self) -> Result<bool, ClientError> {
        if !self.session_authorized() {
            return Ok(false);
        }

        let result = self.request("auth.status", json!({})).await?;

        Ok(result
            .get("authorized")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    async fn get_me(&self) -> Result<SelfUser, ClientError> {
        let result = self.request("users.me", json!({})).await?;

        Ok(SelfUser {
            id: expect_i64(&result, "id")?,
            is_bot: result.get("bot").and_then(Value::as_bool).unwrap_or(false),
            first_name: opt_string(&result, "firstName").unwrap_or_default(),
            username: opt_string(&result, "username").unwrap_or_default(),
        })
    }

    async fn get_entity(&self, peer_id: i64) -> Result<PeerEntity, ClientError> {
        let result = self
            .request("contacts.resolve", json!({ "peerId": peer_id }))
            .await?;

        Ok(PeerEntity {
            id: expect_i64(&result, "id")?,
            first_name: opt_string(&result, "firstName"),
            username: opt_string(&result, "username"),
            lang_code: opt_string(&result, "langCode"),
            is_bot: result.get("bot").and_then(Value::as_bool).unwrap_or(false),
            premium: result
                .get("premium")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
    }

    async fn get_message(
        &self,
        chat_id: i64,
        message_id: i64,
    ) -> Result<Option<MessageEntity>, ClientError> {
        let result = self
            .request(
                "messages.get",
                json!({ "chatId": chat_id, "messageId": message_id }),
            )
            .await?;

        if result.is_null() {
            return Ok(None);
        }

        Ok(Some(message_from_value(&result)?))
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<MessageEntity, ClientError> {
        let result = self
            .request(
                "messages.edit",
                json!({ "chatId": chat_id, "messageId": message_id, "text": text }),
            )
            .await?;

        message_from_value(&result)
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), ClientError> {
        self.request(
            "messages.delete",
            json!({ "chatId": chat_id, "messageIds": [message_id] }),
        )
        .await?;

        Ok(())
    }

    async fn sync_state(&self) -> Result<(), ClientError> {
        self.request("updates.state", json!({})).await?;

        Ok(())
    }

    async fn catch_up(&self) -> Result<(), ClientError> {
        self.request("updates.catchUp", json!({})).await?;

        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);

        let mut writer = self.writer.lock().await;
        if let Err(err) = writer.shutdown().await {
            debug!("shutdown of session {} returned: {err}", self.session_name);
        }
    }
}

/// Reads frames until the connection drops, routing responses to their
/// waiting requests and fanning events out to subscribers.
async fn read_loop(client: Arc<BackendClient>, read_half: OwnedReadHalf) {
    let mut lines = BufReader::new(read_half).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                error!("transport read failed for {}: {err}", client.session_name);
                break;
            }
        };

        let frame: Value = match serde_json::from_str(&line) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("dropping malformed frame from {}: {err}", client.session_name);
                continue;
            }
        };

        if let Some(id) = frame.get("id").and_then(Value::as_u64) {
            let outcome = match frame.get("error") {
                Some(error) if !error.is_null() => Err(ClientError::Transport(
                    error
                        .as_str()
                        .map(str::to_owned)
                        .unwrap_or_else(|| error.to_string()),
                )),
                _ => Ok(frame.get("result").cloned().unwrap_or(Value::Null)),
            };

            if let Some(tx) = client.pending.lock().await.remove(&id) {
                let _ = tx.send(outcome);
            }
        } else if frame.get("event").is_some() {
            if let Some(event) = parse_event(&frame) {
                // A send error only means nobody subscribed yet.
                let _ = client.events.send(event);
            }
        }
    }

    client.connected.store(false, Ordering::Release);

    let mut pending = client.pending.lock().await;
    for (_, tx) in pending.drain() {
        let _ = tx.send(Err(ClientError::Disconnected));
    }
}

fn parse_event(frame: &Value) -> Option<ClientEvent> {
    match frame.get("event")?.as_str()? {
        "message" => Some(ClientEvent::NewMessage(MessageEntity {
            id: frame.get("messageId")?.as_i64()?,
            chat_id: frame.get("chatId")?.as_i64()?,
            sender_id: frame.get("senderId")?.as_i64()?,
            date: frame.get("date").and_then(Value::as_i64).unwrap_or(0),
            edit_date: frame.get("editDate").and_then(Value::as_i64),
            text: opt_string(frame, "text").unwrap_or_default(),
            outgoing: frame.get("out").and_then(Value::as_bool).unwrap_or(false),
        })),
        "callback_query" => {
            let user_id = frame.get("userId")?.as_i64()?;

            Some(ClientEvent::CallbackQuery(CallbackEvent {
                query_id: frame.get("queryId")?.as_i64()?,
                user_id,
                // Group presses carry the peer chat; private presses fall
                // back to the pressing user.
                chat_id: frame
                    .get("chatId")
                    .and_then(Value::as_i64)
                    .unwrap_or(user_id),
                msg_id: frame.get("msgId")?.as_i64()?,
                data: opt_string(frame, "data").unwrap_or_default().into_bytes(),
            }))
        }
        _ => None,
    }
}

fn message_from_value(value: &Value) -> Result<MessageEntity, ClientError> {
    Ok(MessageEntity {
        id: expect_i64(value, "id")?,
        chat_id: expect_i64(value, "chatId")?,
        sender_id: expect_i64(value, "senderId")?,
        date: value.get("date").and_then(Value::as_i64).unwrap_or(0),
        edit_date: value.get("editDate").and_then(Value::as_i64),
        text: opt_string(value, "text").unwrap_or_default(),
        outgoing: value.get("out").and_then(Value::as_bool).unwrap_or(false),
    })
}

fn expect_i64(value: &Value, key: &str) -> Result<i64, ClientError> {
    value
        .get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| ClientError::Transport(format!("frame is missing field `{key}`")))
}

fn opt_string(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_owned)
}
