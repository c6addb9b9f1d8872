// src/lts/filesystem.rs

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use super::{canonical_json, ContentId, LongTermStore};
use crate::storage::Environment;

/// Snapshot store that keeps one `<cid>.json` file per record
///
/// Snapshots are immutable: a file that already exists is never rewritten.
/// New files are written to a temporary name and renamed into place so a
/// reader never sees a partial snapshot.
#[derive(Debug, Clone)]
pub struct FilesystemLongTermStore {
    root: PathBuf,
}

impl FilesystemLongTermStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("Failed to create snapshot directory {}", root.display()))?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn snapshot_path(&self, cid: &ContentId) -> PathBuf {
        self.root.join(format!("{}.json", cid))
    }
}

#[async_trait]
impl LongTermStore for FilesystemLongTermStore {
    async fn normalize(&self, environment: &Environment) -> Result<(ContentId, String)> {
        let canonical = canonical_json(environment)?;
        let cid = ContentId::of(&canonical);
        let path = self.snapshot_path(&cid);

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!(cid = %cid, "Snapshot already stored");
            return Ok((cid, canonical));
        }

        let tmp_path = self.root.join(format!(".{}.{}.tmp", cid, Uuid::new_v4().simple()));
        tokio::fs::write(&tmp_path, canonical.as_bytes())
            .await
            .with_context(|| format!("Failed to write snapshot {}", tmp_path.display()))?;

        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e).with_context(|| format!("Failed to store snapshot {}", path.display()));
        }

        Ok((cid, canonical))
    }

    async fn fetch(&self, cid: &str) -> Result<Option<String>> {
        let Some(cid) = ContentId::parse(cid) else {
            return Ok(None);
        };

        match tokio::fs::read_to_string(self.snapshot_path(&cid)).await {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read snapshot {}", cid)),
        }
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}
