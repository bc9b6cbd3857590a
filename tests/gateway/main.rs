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

//! End-to-end scenarios of the gateway, driven over real HTTP against a
//! fake backend client and a recording admin server.

mod helpers;

use std::time::{Duration, Instant};

use gatebot::{
    client::{CallbackEvent, MessageEntity},
    storage::{TokenRecord, TokenStore},
};
use helpers::{MemoryTokenStore, TestApp, spawn_app};
use pretty_assertions::assert_eq;
use serde_json::json;

fn incoming_message(id: i64, text: &str) -> MessageEntity {
    MessageEntity {
        id,
        chat_id: 42,
        sender_id: 42,
        date: 1700000000,
        edit_date: None,
        text: text.to_owned(),
        outgoing: false,
    }
}

#[tokio::test]
async fn get_me_happy_path() {
    let app = spawn_app().await;

    let (status, body) = app.get_json("getMe").await;

    assert_eq!(status.as_u16(), 200);
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["result"]["id"], json!(123));
    assert_eq!(body["result"]["is_bot"], json!(true));
    assert_eq!(body["result"]["username"], json!("gatetest_bot"));
    assert_eq!(body["result"]["can_join_groups"], json!(true));
}

#[tokio::test]
async fn unknown_token_is_rejected_with_401() {
    let app = spawn_app().await;

    let response = app
        .http
        .get(format!("{}/botDEADBEEF/getMe", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);

    let body: serde_json::Value = response.json().await.unwrap();

    assert_eq!(
        body,
        json!({"ok": false, "error_code": 401, "description": "Unauthorized"})
    );
}

#[tokio::test]
async fn send_message_with_inline_keyboard_round_trips() {
    let app = spawn_app().await;

    let (status, body) = app
        .post_json(
            "sendMessage",
            json!({
                "chat_id": 42,
                "text": "hi",
                "reply_markup": {
                    "inline_keyboard": [[{ "text": "B", "callback_data": "x" }]]
                },
            }),
        )
        .await;

    assert_eq!(status.as_u16(), 200);
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["result"]["message_id"], json!(777));
    assert_eq!(body["result"]["from"]["id"], json!(123));
    assert_eq!(body["result"]["chat"]["id"], json!(42));
    assert_eq!(body["result"]["chat"]["type"], json!("private"));
    assert_eq!(body["result"]["text"], json!("hi"));
    assert_eq!(
        body["result"]["reply_markup"],
        json!({ "inline_keyboard": [[{ "text": "B", "callback_data": "x" }]] })
    );

    // Exactly one admin post, with the camelCase button translation.
    let sent = app.admin.send_messages.lock().unwrap().clone();

    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["fromUserId"], json!(123));
    assert_eq!(sent[0]["toUserId"], json!(42));
    assert_eq!(sent[0]["message"], json!("hi"));
    assert_eq!(sent[0]["silent"], json!(false));
    assert_eq!(
        sent[0]["buttons"],
        json!([[{ "text": "B", "callbackData": "x" }]])
    );
}

#[tokio::test]
async fn send_message_accepts_query_string_parameters() {
    let app = spawn_app().await;

    let (status, body) = app
        .get_json("sendMessage?chat_id=42&text=hello%20there")
        .await;

    assert_eq!(status.as_u16(), 200);
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["result"]["text"], json!("hello there"));
}

#[tokio::test]
async fn send_message_accepts_form_encoded_bodies() {
    let app = spawn_app().await;

    let response = app
        .http
        .post(app.url("sendMessage"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("chat_id=42&text=form+hello")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();

    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["result"]["text"], json!("form hello"));
}

#[tokio::test]
async fn send_message_requires_chat_id_and_text() {
    let app = spawn_app().await;

    let (status, body) = app.post_json("sendMessage", json!({ "text": "hi" })).await;

    assert_eq!(status.as_u16(), 200);
    assert_eq!(
        body,
        json!({
            "ok": false,
            "error_code": 400,
            "description": "Missing required parameters"
        })
    );
}

#[tokio::test]
async fn send_message_to_self_is_rejected() {
    let app = spawn_app().await;

    let (_, body) = app
        .post_json("sendMessage", json!({ "chat_id": 123, "text": "hi" }))
        .await;

    assert_eq!(body["ok"], json!(false));
    assert_eq!(body["error_code"], json!(400));
    assert_eq!(body["description"], json!("Bot can't send messages to itself"));
}

#[tokio::test]
async fn long_poll_on_an_empty_queue_waits_out_the_timeout() {
    let app = spawn_app().await;

    let started = Instant::now();
    let (status, body) = app.get_json("getUpdates?offset=0&timeout=2").await;
    let elapsed = started.elapsed();

    assert_eq!(status.as_u16(), 200);
    assert_eq!(body, json!({"ok": true, "result": []}));
    assert!(
        elapsed >= Duration::from_millis(1500) && elapsed < Duration::from_secs(8),
        "long poll returned after {elapsed:?}"
    );
}

#[tokio::test]
async fn long_poll_delivers_a_concurrent_update() {
    let app = spawn_app().await;
    app.prime().await;

    let poll_url = format!(
        "{}/bot{}/getUpdates?offset=0&timeout=10",
        app.address,
        TestApp::TOKEN
    );
    let poll = tokio::spawn(async move {
        reqwest::get(poll_url)
            .await
            .unwrap()
            .json::<serde_json::Value>()
            .await
            .unwrap()
    });

    tokio::time::sleep(Duration::from_millis(400)).await;
    app.client.push_message(incoming_message(900, "ping"));

    let started = Instant::now();
    let body = poll.await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(body["ok"], json!(true));

    let updates = body["result"].as_array().unwrap();

    assert_eq!(updates.len(), 1);
    assert!(updates[0]["update_id"].as_i64().is_some());
    assert_eq!(updates[0]["message"]["text"], json!("ping"));
    assert_eq!(updates[0]["message"]["from"]["id"], json!(42));
    assert_eq!(updates[0]["message"]["chat"]["type"], json!("private"));
}

#[tokio::test]
async fn updates_are_monotonic_deduplicated_and_acknowledged() {
    let app = spawn_app().await;
    app.prime().await;

    app.client.push_message(incoming_message(901, "first"));
    app.client.push_message(incoming_message(901, "first"));
    app.client.push_message(incoming_message(902, "second"));

    // The duplicate of 901 must be suppressed.
    let updates = app.wait_for_updates(0, 2).await;

    assert_eq!(updates.len(), 2);

    let first_id = updates[0]["update_id"].as_i64().unwrap();
    let second_id = updates[1]["update_id"].as_i64().unwrap();

    assert!(first_id < second_id);
    assert_eq!(updates[0]["message"]["text"], json!("first"));
    assert_eq!(updates[1]["message"]["text"], json!("second"));

    // Acknowledging with offset == second_id drops everything below it.
    let (_, body) = app
        .get_json(&format!("getUpdates?offset={second_id}&timeout=0"))
        .await;
    let remaining = body["result"].as_array().unwrap();

    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["update_id"].as_i64(), Some(second_id));

    // And past the end the queue is empty for good.
    let (_, body) = app
        .get_json(&format!("getUpdates?offset={}&timeout=0", second_id + 1))
        .await;

    assert_eq!(body["result"], json!([]));

    let (_, body) = app.get_json("getUpdates?offset=0&timeout=0").await;

    assert_eq!(body["result"], json!([]));
}

#[tokio::test]
async fn callback_answer_round_trip() {
    let app = spawn_app().await;
    app.prime().await;

    app.client.seed_entity(gatebot::client::PeerEntity {
        id: 55,
        first_name: Some(String::from("Bruno")),
        username: Some(String::from("bruno")),
        lang_code: None,
        is_bot: false,
        premium: false,
    });
    app.client.seed_message(MessageEntity {
        id: 10,
        chat_id: 55,
        sender_id: 123,
        date: 1700000100,
        edit_date: None,
        text: String::from("menu"),
        outgoing: true,
    });

    app.client.push_callback(CallbackEvent {
        query_id: 7,
        user_id: 55,
        chat_id: 55,
        msg_id: 10,
        data: b"x".to_vec(),
    });

    // The callback update must surface through getUpdates.
    let updates = app.wait_for_updates(0, 1).await;
    let query = &updates[0]["callback_query"];

    assert_eq!(query["id"], json!("7"));
    assert_eq!(query["from"]["id"], json!(55));
    assert_eq!(query["data"], json!("x"));
    assert_eq!(query["message"]["message_id"], json!(10));
    assert_eq!(query["message"]["text"], json!("menu"));

    // Depositing the answer unblocks the watcher, which posts the admin
    // call exactly once and empties the mailbox.
    let (_, body) = app
        .post_json(
            "answerCallbackQuery",
            json!({ "callback_query_id": "7", "text": "ok", "show_alert": true }),
        )
        .await;

    assert_eq!(body, json!({"ok": true, "result": true}));

    let mut forwarded = None;
    for _ in 0..40 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let answers = app.admin.answers.lock().unwrap().clone();
        if !answers.is_empty() {
            forwarded = Some(answers);
            break;
        }
    }

    let forwarded = forwarded.expect("the watcher never forwarded the answer");

    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0]["queryId"], json!(7));
    assert_eq!(forwarded[0]["peerId"], json!(55));
    assert_eq!(forwarded[0]["msgId"], json!(10));
    assert_eq!(forwarded[0]["alert"], json!(true));
    assert_eq!(forwarded[0]["message"], json!("ok"));
    assert_eq!(forwarded[0]["cacheTime"], json!(0));

    // The mailbox record is gone and no second post ever happens.
    use gatebot::storage::CallbackAnswerStore;

    assert!(app.callbacks.get("7").await.unwrap().is_none());

    tokio::time::sleep(Duration::from_millis(700)).await;

    assert_eq!(app.admin.answers.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn answer_callback_query_requires_the_query_id() {
    let app = spawn_app().await;

    let (_, body) = app
        .post_json("answerCallbackQuery", json!({ "text": "ok" }))
        .await;

    assert_eq!(
        body,
        json!({
            "ok": false,
            "error_code": 400,
            "description": "Missing callback_query_id"
        })
    );
}

#[tokio::test]
async fn edit_message_text_flows() {
    let app = spawn_app().await;

    app.client.seed_message(MessageEntity {
        id: 10,
        chat_id: 42,
        sender_id: 123,
        date: 1700000200,
        edit_date: None,
        text: String::from("old"),
        outgoing: true,
    });

    // Identical text is the upstream "not modified" 400.
    let (status, body) = app
        .post_json(
            "editMessageText",
            json!({ "chat_id": 42, "message_id": 10, "text": "old" }),
        )
        .await;

    assert_eq!(status.as_u16(), 200);
    assert_eq!(body["ok"], json!(false));
    assert_eq!(body["error_code"], json!(400));
    assert_eq!(body["description"], json!("Message is not modified"));

    // A real edit returns the canonical message with an edit date.
    let (_, body) = app
        .post_json(
            "editMessageText",
            json!({ "chat_id": 42, "message_id": 10, "text": "new" }),
        )
        .await;

    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["result"]["message_id"], json!(10));
    assert_eq!(body["result"]["text"], json!("new"));
    assert_eq!(body["result"]["edit_date"], json!(1700000205));

    // An unknown message is a 400.
    let (_, body) = app
        .post_json(
            "editMessageText",
            json!({ "chat_id": 42, "message_id": 99, "text": "new" }),
        )
        .await;

    assert_eq!(body["description"], json!("Message not found"));
}

#[tokio::test]
async fn delete_message_delegates_to_the_client() {
    let app = spawn_app().await;

    app.client.seed_message(MessageEntity {
        id: 11,
        chat_id: 42,
        sender_id: 123,
        date: 1700000300,
        edit_date: None,
        text: String::from("bye"),
        outgoing: true,
    });

    let (status, body) = app
        .post_json("deleteMessage", json!({ "chat_id": 42, "message_id": 11 }))
        .await;

    assert_eq!(status.as_u16(), 200);
    assert_eq!(body, json!({"ok": true, "result": true}));
    assert_eq!(app.client.deleted.lock().unwrap().clone(), vec![(42, 11)]);
}

#[tokio::test]
async fn unknown_methods_are_reported_by_name() {
    let app = spawn_app().await;

    let (status, body) = app.get_json("getChatMember").await;

    assert_eq!(status.as_u16(), 200);
    assert_eq!(
        body,
        json!({
            "ok": false,
            "error_code": 400,
            "description": "Method 'getChatMember' not implemented"
        })
    );
}

#[tokio::test]
async fn missing_method_is_a_400() {
    let app = spawn_app().await;

    let response = app
        .http
        .get(format!("{}/bot{}", app.address, TestApp::TOKEN))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();

    assert_eq!(body["error_code"], json!(400));
    assert_eq!(body["description"], json!("Method not specified"));
}

#[tokio::test]
async fn unrouted_paths_are_a_json_404() {
    let app = spawn_app().await;

    let response = app
        .http
        .get(format!("{}/health", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);

    let body: serde_json::Value = response.json().await.unwrap();

    assert_eq!(
        body,
        json!({"ok": false, "error_code": 404, "description": "Not Found"})
    );
}

#[tokio::test]
async fn token_lookup_matches_on_both_forms() {
    let store = MemoryTokenStore::default();
    let record = TokenRecord::issue(7, "bot_7_1700000000", "seven_bot", "Seven", 1);

    store.create(&record).await.unwrap();

    assert_eq!(store.lookup(&record.token).await.unwrap(), Some(record.clone()));
    assert_eq!(
        store.lookup(&record.full_token).await.unwrap(),
        Some(record)
    );
    assert_eq!(store.lookup("missing").await.unwrap(), None);
}
