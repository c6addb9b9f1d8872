// src/lts/memory.rs

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use super::{canonical_json, ContentId, LongTermStore};
use crate::storage::Environment;

/// In-memory snapshot store backed by a concurrent map
#[derive(Debug, Clone, Default)]
pub struct MemoryLongTermStore {
    snapshots: Arc<DashMap<ContentId, String>>,
}

impl MemoryLongTermStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Store a raw snapshot under its own content identifier
    pub fn insert_raw(&self, canonical: impl Into<String>) -> ContentId {
        let canonical = canonical.into();
        let cid = ContentId::of(&canonical);
        self.snapshots.insert(cid.clone(), canonical);
        cid
    }
}

#[async_trait]
impl LongTermStore for MemoryLongTermStore {
    async fn normalize(&self, environment: &Environment) -> Result<(ContentId, String)> {
        let canonical = canonical_json(environment)?;
        let cid = ContentId::of(&canonical);

        self.snapshots
            .entry(cid.clone())
            .or_insert_with(|| canonical.clone());

        Ok((cid, canonical))
    }

    async fn fetch(&self, cid: &str) -> Result<Option<String>> {
        let Some(cid) = ContentId::parse(cid) else {
            return Ok(None);
        };

        Ok(self.snapshots.get(&cid).map(|entry| entry.value().clone()))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
