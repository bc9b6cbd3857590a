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

//! Per-session client registry.
//!
//! # Description
//!
//! Every bot shares one long-lived client session, opened lazily on first
//! demand and cached for the lifetime of the process. A cache hit is
//! revalidated with a `get_me` probe; a dead client is replaced by a fresh
//! connect → authorize → probe → catch-up cycle. Two cold-cache probes for
//! the same session serialize on a per-name initialization lock, so the
//! session file is never opened twice concurrently.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex as StdMutex},
};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    client::{ClientConnector, MtClient},
    errors::ClientError,
};

pub struct ClientRegistry {
    connector: Arc<dyn ClientConnector>,
    sessions_dir: PathBuf,
    cache: Mutex<HashMap<String, Arc<dyn MtClient>>>,
    init_locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ClientRegistry {
    pub fn new(connector: Arc<dyn ClientConnector>, sessions_dir: impl Into<PathBuf>) -> Self {
        ClientRegistry {
            connector,
            sessions_dir: sessions_dir.into(),
            cache: Mutex::new(HashMap::new()),
            init_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Returns a live, authorized client for the session, reusing the cached
    /// one when it still answers.
    pub async fn get(&self, session_name: &str) -> Result<Arc<dyn MtClient>, ClientError> {
        if let Some(client) = self.probe_cached(session_name).await {
            debug!("reusing cached client for {session_name}");
            return Ok(client);
        }

        let lock = self.init_lock(session_name);
        let _guard = lock.lock().await;

        // Another request may have finished initializing while we waited.
        if let Some(client) = self.probe_cached(session_name).await {
            return Ok(client);
        }

        let client = self.open(session_name).await?;
        self.cache
            .lock()
            .await
            .insert(session_name.to_owned(), Arc::clone(&client));

        Ok(client)
    }

    /// Whether a session file exists for the name, authorized or not.
    pub fn has_session(&self, session_name: &str) -> bool {
        self.session_path(session_name).exists()
    }

    pub async fn disconnect_all(&self) {
        let mut cache = self.cache.lock().await;
        for (session_name, client) in cache.drain() {
            debug!("disconnecting session {session_name}");
            client.disconnect().await;
        }
    }

    async fn probe_cached(&self, session_name: &str) -> Option<Arc<dyn MtClient>> {
        let client = self.cache.lock().await.get(session_name).cloned()?;

        if client.is_connected().await && client.get_me().await.is_ok() {
            Some(client)
        } else {
            None
        }
    }

    async fn open(&self, session_name: &str) -> Result<Arc<dyn MtClient>, ClientError> {
        let path = self.session_path(session_name);
        let client = self.connector.connect(session_name, &path).await?;

        let startup = async {
            if !client.is_authorized().await? {
                return Err(ClientError::NotAuthorized);
            }

            let me = client.get_me().await?;

            if let Err(err) = client.sync_state().await {
                warn!("failed to fetch update state for {session_name}: {err}");
            }

            client.catch_up().await?;

            Ok(me)
        };

        match startup.await {
            Ok(me) => {
                info!("Client initialized: {session_name} (ID: {})", me.id);
                Ok(client)
            }
            Err(err) => {
                client.disconnect().await;
                Err(err)
            }
        }
    }

    fn session_path(&self, session_name: &str) -> PathBuf {
        self.sessions_dir.join(format!("{session_name}.session"))
    }

    fn init_lock(&self, session_name: &str) -> Arc<Mutex<()>> {
        self.init_locks
            .lock()
            .expect("init lock table poisoned")
            .entry(session_name.to_owned())
            .or_default()
            .clone()
    }
}
