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

//! Client for the backend's administrative REST API.
//!
//! # Description
//!
//! Outbound messages and callback answers don't travel over the client
//! session; they are posted to the backend's admin surface. Payload keys are
//! camelCase as the admin API expects them. Non-success responses surface
//! their body verbatim so the caller sees the backend's own complaint.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{CALLBACK_ANSWER_TIMEOUT, REQUEST_TIMEOUT, errors::AdminError};

#[derive(Clone)]
pub struct AdminApi {
    http: reqwest::Client,
    base_url: String,
}

/// One inline-keyboard button in the admin payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminButton {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub from_user_id: i64,
    pub to_user_id: i64,
    pub message: String,
    pub silent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Vec<Vec<AdminButton>>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    #[serde(default)]
    pub message_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerCallbackRequest {
    pub query_id: i64,
    pub peer_id: i64,
    pub msg_id: i64,
    pub alert: bool,
    // The backend expects explicit nulls for an answer without text or URL.
    pub message: Option<String>,
    pub url: Option<String>,
    pub cache_time: i64,
}

impl AdminApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        AdminApi {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    pub async fn send_message(
        &self,
        request: &SendMessageRequest,
    ) -> Result<SendMessageResponse, AdminError> {
        debug!("posting send-message for bot {}", request.from_user_id);

        let response = self
            .http
            .post(format!("{}/send-message", self.base_url))
            .timeout(REQUEST_TIMEOUT)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AdminError::Rejected { status, body });
        }

        Ok(response.json().await?)
    }

    pub async fn answer_callback(
        &self,
        request: &AnswerCallbackRequest,
    ) -> Result<(), AdminError> {
        debug!("posting answer-callback for query {}", request.query_id);

        let response = self
            .http
            .post(format!("{}/answer-callback", self.base_url))
            .timeout(CALLBACK_ANSWER_TIMEOUT)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AdminError::Rejected { status, body });
        }

        Ok(())
    }
}
