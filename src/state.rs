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

//! Shared state of the gateway.

use std::sync::Arc;

use crate::{
    admin::AdminApi,
    client::ClientRegistry,
    storage::{CallbackAnswerStore, TokenStore},
    updates::UpdatesManager,
};

/// Top-level owner of every registry the request path touches. One instance
/// lives behind an `Arc` for the lifetime of the process; handlers, ingest
/// tasks and reconciler watchers all hold clones of that handle.
pub struct GatewayState {
    pub brand: String,
    pub tokens: Arc<dyn TokenStore>,
    pub callbacks: Arc<dyn CallbackAnswerStore>,
    pub registry: ClientRegistry,
    pub updates: UpdatesManager,
    pub admin: AdminApi,
}

impl GatewayState {
    pub fn new(
        brand: impl Into<String>,
        tokens: Arc<dyn TokenStore>,
        callbacks: Arc<dyn CallbackAnswerStore>,
        registry: ClientRegistry,
        admin: AdminApi,
    ) -> Self {
        GatewayState {
            brand: brand.into(),
            tokens,
            callbacks,
            registry,
            updates: UpdatesManager::new(),
            admin,
        }
    }
}
