use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::auth::repo_types::Principal;

/// Fixed key the session snapshot is stored under.
pub const SESSION_KEY: &str = "user";

/// Durable storage for the single session snapshot.
/// Absence of the key means unauthenticated.
#[async_trait]
pub trait SessionPersistence: Send + Sync {
    async fn load(&self) -> anyhow::Result<Option<Principal>>;
    async fn save(&self, principal: &Principal) -> anyhow::Result<()>;
    /// Removing an absent key succeeds.
    async fn clear(&self) -> anyhow::Result<()>;
}

/// Stores the snapshot as `<dir>/user.json`.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{SESSION_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionPersistence for FileSessionStore {
    async fn load(&self) -> anyhow::Result<Option<Principal>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("read {}", self.path.display()));
            }
        };
        let principal = serde_json::from_slice(&raw)
            .with_context(|| format!("decode {}", self.path.display()))?;
        Ok(Some(principal))
    }

    async fn save(&self, principal: &Principal) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("create {}", dir.display()))?;
        }
        let body = serde_json::to_vec(principal).context("encode session")?;
        // Write then rename: readers see the old snapshot or the new one, never half.
        // Each save gets its own temp file so concurrent saves never share one.
        let tmp = self
            .path
            .with_extension(format!("json.{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&tmp, body)
            .await
            .with_context(|| format!("write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("rename into {}", self.path.display()))?;
        debug!(path = %self.path.display(), user_id = %principal.id, "session saved");
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "session cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", self.path.display())),
        }
    }
}

/// Keeps the serialized snapshot in memory. Shared clones see the same slot.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Option<String>>> {
        self.slot
            .lock()
            .map_err(|_| anyhow::anyhow!("session slot poisoned"))
    }
}

#[async_trait]
impl SessionPersistence for MemorySessionStore {
    async fn load(&self) -> anyhow::Result<Option<Principal>> {
        let raw = self.slot()?.clone();
        raw.map(|s| serde_json::from_str(&s).context("decode session"))
            .transpose()
    }

    async fn save(&self, principal: &Principal) -> anyhow::Result<()> {
        let body = serde_json::to_string(principal).context("encode session")?;
        *self.slot()? = Some(body);
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        *self.slot()? = None;
        Ok(())
    }
}
