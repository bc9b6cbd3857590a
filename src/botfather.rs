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

//! Token bootstrap for the privileged "BotFather" account.
//!
//! # Description
//!
//! The privileged account drives bot provisioning and therefore needs a
//! token like any other bot. At startup, if its session is authorized, the
//! gateway makes sure a token record exists: an existing record is reused
//! (backfilling a missing `full_token`), otherwise a fresh one is minted
//! and logged once so the operator can copy it.
//!
//! Interactive sign-in of the account is not the gateway's job; a missing
//! or unauthorized session is reported and skipped.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::{
    state::GatewayState,
    storage::{TokenRecord, TokenUpdate},
};

pub const BOTFATHER_SESSION: &str = "botfather";

/// Ensures the privileged token record exists. Returns the full token when
/// the account is usable.
pub async fn ensure_token(state: &Arc<GatewayState>, phone: &str) -> Option<String> {
    if !state.registry.has_session(BOTFATHER_SESSION) {
        warn!("No session found for the BotFather account ({phone}); authorize it externally");
        return None;
    }

    let client = match state.registry.get(BOTFATHER_SESSION).await {
        Ok(client) => client,
        Err(err) => {
            error!("Failed to open the BotFather session: {err}");
            return None;
        }
    };

    let me = match client.get_me().await {
        Ok(me) => me,
        Err(err) => {
            // No identity means no record to reconcile against; skip the
            // bootstrap instead of inventing an id.
            error!("Failed to resolve the BotFather identity: {err}");
            return None;
        }
    };

    match state.tokens.lookup_bot(me.id).await {
        Ok(Some(record)) => {
            if record.full_token.is_empty() {
                let full_token = format!("{}:{}", me.id, record.token);
                let patch = TokenUpdate {
                    full_token: Some(full_token.clone()),
                    ..TokenUpdate::default()
                };

                if let Err(err) = state.tokens.update(me.id, patch).await {
                    error!("Failed to backfill the BotFather token: {err}");
                    return None;
                }

                info!("BotFather token: {full_token}");
                Some(full_token)
            } else {
                info!("BotFather token: {}", record.full_token);
                Some(record.full_token)
            }
        }
        Ok(None) => {
            let mut record = TokenRecord::issue(me.id, BOTFATHER_SESSION, "BotFather", "BotFather", 0);
            record.verified = true;

            match state.tokens.create(&record).await {
                Ok(()) => {
                    info!("Created BotFather token: {}", record.full_token);
                    Some(record.full_token)
                }
                Err(err) => {
                    error!("Failed to create the BotFather token: {err}");
                    None
                }
            }
        }
        Err(err) => {
            error!("Token lookup for the BotFather account failed: {err}");
            None
        }
    }
}
