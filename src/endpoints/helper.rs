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

//! Shared plumbing of the endpoint handlers: parameter coercion, the
//! inline-keyboard translation and the canonical message object.
//!
//! Parameters arrive as loose JSON values: query strings deliver every
//! scalar as a string, JSON bodies deliver native types. The coercion
//! helpers accept both.

use serde_json::{Value, json};

use crate::{
    admin::AdminButton,
    client::{PeerEntity, SelfUser},
    errors::GatewayError,
    wire::{ApiUser, ChatKind, Params},
};

/// A parsed `reply_markup` inline keyboard: the camelCase rows bound for
/// the admin payload and the snake_case rows echoed back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InlineKeyboard {
    pub rows: Vec<Vec<AdminButton>>,
    pub echo: Value,
}

pub(crate) fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(raw) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        Value::Number(number) => number.as_i64().map(|n| n != 0),
        _ => None,
    }
}

pub(crate) fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(raw) => Some(raw.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Missing key → `Missing required parameters`; a present key that cannot
/// be read as an integer is a 400 naming the parameter.
pub(crate) fn required_i64(params: &Params, key: &str) -> Result<i64, GatewayError> {
    let value = params.get(key).ok_or(GatewayError::MissingParameters)?;

    coerce_i64(value).ok_or_else(|| GatewayError::Rejected(format!("invalid {key}")))
}

pub(crate) fn required_string(params: &Params, key: &str) -> Result<String, GatewayError> {
    params
        .get(key)
        .and_then(coerce_string)
        .ok_or(GatewayError::MissingParameters)
}

/// Translates a `reply_markup` value (object or JSON-encoded string) into
/// admin button rows. Markup without an `inline_keyboard` key is ignored.
pub(crate) fn inline_keyboard(reply_markup: &Value) -> Result<Option<InlineKeyboard>, GatewayError> {
    let markup: Value = match reply_markup {
        Value::String(raw) => serde_json::from_str(raw)
            .map_err(|err| GatewayError::Rejected(format!("invalid reply_markup: {err}")))?,
        other => other.clone(),
    };

    let Some(keyboard) = markup.get("inline_keyboard").and_then(Value::as_array) else {
        return Ok(None);
    };

    let mut rows = Vec::with_capacity(keyboard.len());
    let mut echo_rows = Vec::with_capacity(keyboard.len());

    for row in keyboard {
        let buttons = row
            .as_array()
            .ok_or_else(|| GatewayError::Rejected(String::from("invalid reply_markup")))?;

        let mut admin_row = Vec::with_capacity(buttons.len());
        let mut echo_row = Vec::with_capacity(buttons.len());

        for button in buttons {
            let text = button
                .get("text")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    GatewayError::Rejected(String::from("invalid reply_markup: button text is required"))
                })?
                .to_owned();
            let url = button.get("url").and_then(Value::as_str).map(str::to_owned);
            // A URL button wins over callback data, as upstream does.
            let callback_data = if url.is_none() {
                button
                    .get("callback_data")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
            } else {
                None
            };

            let mut echo = json!({ "text": text });
            if let Some(url) = &url {
                echo["url"] = json!(url);
            } else if let Some(data) = &callback_data {
                echo["callback_data"] = json!(data);
            }
            echo_row.push(echo);

            admin_row.push(AdminButton {
                text,
                url,
                callback_data,
            });
        }

        rows.push(admin_row);
        echo_rows.push(Value::Array(echo_row));
    }

    Ok(Some(InlineKeyboard {
        rows,
        echo: json!({ "inline_keyboard": echo_rows }),
    }))
}

/// Canonical message object returned by `sendMessage` and
/// `editMessageText`.
pub(crate) fn message_result(
    message_id: i64,
    me: &SelfUser,
    chat_id: i64,
    chat: &PeerEntity,
    date: i64,
    text: &str,
) -> Value {
    json!({
        "message_id": message_id,
        "from": ApiUser::from_self(me),
        "chat": {
            "id": chat_id,
            "first_name": chat.first_name.clone().unwrap_or_default(),
            "username": chat.username.clone().unwrap_or_default(),
            "type": ChatKind::from_first_name(chat.first_name.as_deref()),
        },
        "date": date,
        "text": text,
    })
}
