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

//! HTTP surface of the gateway.
//!
//! # Description
//!
//! Routes `/bot<TOKEN>/<METHOD>` for both `GET` and `POST` — the literal
//! `bot` is glued to the token with no separator. Parameters come from the
//! query string on `GET`; on `POST` the body is read according to its
//! content type (JSON, urlencoded form, multipart form, or a raw body tried
//! as JSON first and as a query string second). Multi-valued keys carrying
//! a single element collapse to the scalar. Every response is JSON; only
//! `error_code == 401` changes the HTTP status, except for unrouted paths
//! which get a JSON 404.

use std::{collections::HashMap, sync::Arc};

use axum::{
    Json, Router,
    body::to_bytes,
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::any,
};
use serde_json::Value;
use tracing::debug;
use url::form_urlencoded;

use crate::{
    dispatcher,
    state::GatewayState,
    wire::{ApiResponse, Params},
};

/// Bodies beyond this size are not Bot API traffic the gateway serves.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/{token}/{method}", any(bot_api))
        .route("/{token}/{method}/{*rest}", any(bot_api_nested))
        .route("/{token}", any(bot_api_bare))
        .fallback(not_found)
        .with_state(state)
}

async fn bot_api(
    State(state): State<Arc<GatewayState>>,
    Path((token, method)): Path<(String, String)>,
    request: Request,
) -> Response {
    dispatch(state, token, method, request).await
}

// Trailing path segments after the method are accepted and ignored.
async fn bot_api_nested(
    State(state): State<Arc<GatewayState>>,
    Path((token, method, _rest)): Path<(String, String, String)>,
    request: Request,
) -> Response {
    dispatch(state, token, method, request).await
}

async fn bot_api_bare(Path(token): Path<String>) -> Response {
    if token.starts_with("bot") {
        ApiResponse::failure(400, "Method not specified").into_response()
    } else {
        not_found().await.into_response()
    }
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::failure(404, "Not Found")),
    )
}

async fn dispatch(
    state: Arc<GatewayState>,
    token: String,
    method: String,
    request: Request,
) -> Response {
    let Some(token) = token.strip_prefix("bot") else {
        return not_found().await.into_response();
    };

    let params = extract_params(request).await;
    debug!("dispatching {method} with {} parameters", params.len());

    dispatcher::process(&state, token, &method, &params)
        .await
        .into_response()
}

/// Parameter extraction across the transport variants the Bot API allows.
async fn extract_params(request: Request) -> Params {
    if request.method() == Method::GET {
        let query = request.uri().query().unwrap_or_default().to_owned();
        return parse_query(query.as_bytes());
    }

    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.contains("multipart/form-data") {
        return multipart_params(request).await;
    }

    let Ok(body) = to_bytes(request.into_body(), MAX_BODY_BYTES).await else {
        return Params::new();
    };

    if content_type.contains("application/json") {
        return json_object(&body).unwrap_or_default();
    }

    if content_type.contains("application/x-www-form-urlencoded") {
        return parse_query(&body);
    }

    if !body.is_empty() {
        // Untyped bodies: JSON first, then a query string.
        if let Some(params) = json_object(&body) {
            return params;
        }
        return parse_query(&body);
    }

    Params::new()
}

async fn multipart_params(request: Request) -> Params {
    let mut params = Params::new();

    let Ok(mut multipart) = Multipart::from_request(request, &()).await else {
        return params;
    };

    while let Ok(Some(field)) = multipart.next_field().await {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        if let Ok(text) = field.text().await {
            params.insert(name, Value::String(text));
        }
    }

    params
}

fn json_object(body: &[u8]) -> Option<Params> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Decodes a query string into parameters, collapsing single-element lists
/// to their scalar.
fn parse_query(raw: &[u8]) -> Params {
    let mut grouped: HashMap<String, Vec<String>> = HashMap::new();

    for (key, value) in form_urlencoded::parse(raw) {
        grouped
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }

    let mut params = Params::new();
    for (key, mut values) in grouped {
        let value = if values.len() == 1 {
            Value::String(values.swap_remove(0))
        } else {
            Value::Array(values.into_iter().map(Value::String).collect())
        };
        params.insert(key, value);
    }

    params
}
