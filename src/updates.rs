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

//! Per-bot update queues.
//!
//! # Description
//!
//! The updates manager owns, per bot: the ordered queue served by
//! `getUpdates`, the monotonic `update_id` counter (seeded at epoch
//! milliseconds so ids survive restarts without collisions), the dedup maps
//! guarding the ingest handlers, and the handler-registration flag. All
//! mutations are CPU-bound and run under a per-bot mutex that is never held
//! across an await point; the long-poll sleep lives in the `getUpdates`
//! endpoint, outside the lock.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Instant,
};

use chrono::Utc;
use tracing::debug;

use crate::{
    CLEANUP_INTERVAL, MAX_QUEUE_SIZE,
    wire::{Update, UpdateKind},
};

#[derive(Default)]
pub struct UpdatesManager {
    bots: Mutex<HashMap<i64, Arc<Mutex<BotQueue>>>>,
}

struct BotQueue {
    queue: VecDeque<Update>,
    counter: i64,
    seen_messages: HashMap<String, Instant>,
    seen_callbacks: HashMap<String, Instant>,
    handlers_registered: bool,
}

impl BotQueue {
    fn new() -> Self {
        BotQueue {
            queue: VecDeque::new(),
            // Epoch-milliseconds seed keeps ids strictly above anything a
            // previous process run handed out.
            counter: Utc::now().timestamp() * 1000,
            seen_messages: HashMap::new(),
            seen_callbacks: HashMap::new(),
            handlers_registered: false,
        }
    }
}

impl UpdatesManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns the next `update_id`, appends, and resolves overflow by
    /// dropping the oldest entries.
    pub fn add(&self, bot_id: i64, kind: UpdateKind) -> i64 {
        let bot = self.bot(bot_id);
        let mut state = bot.lock().expect("bot queue poisoned");

        state.counter += 1;
        let update_id = state.counter;
        state.queue.push_back(Update { update_id, kind });

        while state.queue.len() > MAX_QUEUE_SIZE {
            state.queue.pop_front();
        }

        debug!("update {update_id} queued for bot {bot_id}");

        update_id
    }

    /// Read path of `getUpdates`: a positive `offset` acknowledges (and
    /// frees) everything below it, then up to `limit` remaining updates are
    /// returned in `update_id` order.
    pub fn get(&self, bot_id: i64, offset: i64, limit: usize) -> Vec<Update> {
        let bot = self.bot(bot_id);
        let mut state = bot.lock().expect("bot queue poisoned");

        if offset > 0 {
            let before = state.queue.len();
            state.queue.retain(|update| update.update_id >= offset);
            let removed = before - state.queue.len();
            if removed > 0 {
                debug!("acknowledged {removed} updates for bot {bot_id}");
            }
        }

        let mut available: Vec<Update> = state
            .queue
            .iter()
            .filter(|update| update.update_id >= offset)
            .cloned()
            .collect();
        available.sort_by_key(|update| update.update_id);
        available.truncate(limit);

        available
    }

    /// Returns `true` when the key was unseen and is now recorded. Entries
    /// older than the cleanup interval are purged on every call.
    pub fn register_message_key(&self, bot_id: i64, key: &str) -> bool {
        let bot = self.bot(bot_id);
        let mut state = bot.lock().expect("bot queue poisoned");

        cleanup(&mut state.seen_messages);
        cleanup(&mut state.seen_callbacks);
        register(&mut state.seen_messages, key)
    }

    /// Callback twin of [`UpdatesManager::register_message_key`].
    pub fn register_callback_key(&self, bot_id: i64, key: &str) -> bool {
        let bot = self.bot(bot_id);
        let mut state = bot.lock().expect("bot queue poisoned");

        cleanup(&mut state.seen_messages);
        cleanup(&mut state.seen_callbacks);
        register(&mut state.seen_callbacks, key)
    }

    /// Check-and-set of the handler-registration flag; only the first caller
    /// per bot gets `true` and may install the event subscription.
    pub fn try_register_handlers(&self, bot_id: i64) -> bool {
        let bot = self.bot(bot_id);
        let mut state = bot.lock().expect("bot queue poisoned");

        if state.handlers_registered {
            false
        } else {
            state.handlers_registered = true;
            true
        }
    }

    fn bot(&self, bot_id: i64) -> Arc<Mutex<BotQueue>> {
        self.bots
            .lock()
            .expect("bot table poisoned")
            .entry(bot_id)
            .or_insert_with(|| Arc::new(Mutex::new(BotQueue::new())))
            .clone()
    }

    #[cfg(test)]
    fn backdate_keys(&self, bot_id: i64, age: std::time::Duration) {
        let bot = self.bot(bot_id);
        let mut state = bot.lock().expect("bot queue poisoned");
        let past = Instant::now().checked_sub(age).expect("age out of range");

        for stamp in state.seen_messages.values_mut() {
            *stamp = past;
        }
        for stamp in state.seen_callbacks.values_mut() {
            *stamp = past;
        }
    }
}

fn register(seen: &mut HashMap<String, Instant>, key: &str) -> bool {
    if seen.contains_key(key) {
        return false;
    }

    seen.insert(key.to_owned(), Instant::now());

    true
}

fn cleanup(seen: &mut HashMap<String, Instant>) {
    seen.retain(|_, stamp| stamp.elapsed() < CLEANUP_INTERVAL);
}
