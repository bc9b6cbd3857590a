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

//! Main file of the GateBot server.

use std::sync::Arc;

use chrono::Utc;
use gatebot::{
    admin::AdminApi,
    botfather,
    client::{BackendConnector, ClientRegistry, KeyTable},
    configuration::Settings,
    http,
    state::GatewayState,
    storage::{CallbackAnswerStore, MongoStorage, TokenStore},
    telemetry::{get_subscriber, init_subscriber},
};
use secrecy::ExposeSecret;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load the settings.
    let settings = Settings::new().expect("Failed to read the configuration from the environment.");

    // Initialize the tracing subsystem.
    let subscriber = get_subscriber(settings.tracing_level.as_str());
    init_subscriber(subscriber);

    let sessions_dir = std::path::Path::new(&settings.sessions_dir);
    if !sessions_dir.exists() {
        std::fs::create_dir_all(sessions_dir)?;
        info!("Created directory: {}", settings.sessions_dir);
    }

    let storage = Arc::new(
        MongoStorage::connect(settings.mongodb_uri.expose_secret())
            .await
            .expect("Failed to connect the storage backend."),
    );

    // The backend's RSA key goes into the table once, as both the current
    // and the old key, so rotations keep cached sessions valid.
    let mut keys = KeyTable::default();
    keys.install(settings.public_key.expose_secret());

    let connector = BackendConnector::new(
        settings.domain.clone(),
        settings.port,
        settings.api_id,
        settings.api_hash.expose_secret(),
        keys,
    );
    let registry = ClientRegistry::new(Arc::new(connector), settings.sessions_dir.clone());
    let admin = AdminApi::new(settings.admin_api_url.clone());

    let state = Arc::new(GatewayState::new(
        settings.brand.clone(),
        Arc::clone(&storage) as Arc<dyn TokenStore>,
        storage as Arc<dyn CallbackAnswerStore>,
        registry,
        admin,
    ));

    info!("{}", state.brand);
    info!("Started: {}", Utc::now().format("%Y-%m-%d %H:%M:%S"));

    match settings.botfather_phone.as_deref() {
        Some(phone) => {
            botfather::ensure_token(&state, phone).await;
        }
        None => warn!("BOTFATHER_PHONE is not set; skipping the privileged token bootstrap"),
    }

    let app = http::router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", settings.http_port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&state)))
        .await?;

    info!("Gracefully closed the gateway server");

    Ok(())
}

async fn shutdown_signal(state: Arc<GatewayState>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for the shutdown signal: {err}");
        return;
    }

    info!("Shutdown signal received, disconnecting client sessions");
    state.registry.disconnect_all().await;
}
