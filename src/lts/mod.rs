// src/lts/mod.rs

//! Long-term storage of immutable, content-addressed record snapshots.
//!
//! Every created Environment is normalized into a canonical JSON string and
//! stored under the SHA-256 of that string. The get handler consults this
//! store when the document database has no match for a key.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

pub mod filesystem;
pub mod memory;

use crate::storage::Environment;

/// Content identifier: lowercase hex SHA-256 of a canonical JSON string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    pub fn of(canonical: &str) -> Self {
        Self(hex::encode(Sha256::digest(canonical.as_bytes())))
    }

    /// Accept only well-formed identifiers. Anything else is a lookup miss.
    pub fn parse(candidate: &str) -> Option<Self> {
        let well_formed = candidate.len() == 64
            && candidate
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));

        well_formed.then(|| Self(candidate.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical JSON for a record: no `_key`, object keys sorted, compact.
pub fn canonical_json(environment: &Environment) -> serde_json::Result<String> {
    let mut value = serde_json::to_value(environment)?;
    if let Value::Object(ref mut object) = value {
        object.remove("_key");
    }

    // serde_json's default map is ordered by key, so re-serializing through
    // Value yields a stable ordering at every depth
    serde_json::to_string(&value)
}

/// Content-addressed snapshot store
#[async_trait]
pub trait LongTermStore: Send + Sync {
    /// Persist the record's canonical snapshot and return its identifier
    /// along with the canonical JSON.
    async fn normalize(&self, environment: &Environment) -> Result<(ContentId, String)>;

    /// Fetch the snapshot stored under `cid`, if any
    async fn fetch(&self, cid: &str) -> Result<Option<String>>;

    fn backend_name(&self) -> &'static str;
}
