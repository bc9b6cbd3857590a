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

//! RSA key table of the backend.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

/// Table of backend public keys, keyed by fingerprint.
///
/// Every installed key lands in both the *current* and the *old* slot, so a
/// key rotation on the backend keeps existing sessions valid. The table is
/// built once at startup and handed to every connector handshake.
#[derive(Debug, Clone, Default)]
pub struct KeyTable {
    current: HashMap<String, String>,
    old: HashMap<String, String>,
}

impl KeyTable {
    /// Installs a PEM-encoded key under both slots and returns its
    /// fingerprint.
    pub fn install(&mut self, pem: &str) -> String {
        let fingerprint = fingerprint(pem);

        self.current.insert(fingerprint.clone(), pem.to_owned());
        self.old.insert(fingerprint.clone(), pem.to_owned());

        fingerprint
    }

    pub fn fingerprints(&self) -> Vec<String> {
        let mut fingerprints: Vec<String> = self.current.keys().cloned().collect();
        fingerprints.sort();

        fingerprints
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}

/// Truncated SHA-256 over the trimmed PEM body.
fn fingerprint(pem: &str) -> String {
    let digest = Sha256::digest(pem.trim().as_bytes());

    digest
        .iter()
        .take(8)
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
