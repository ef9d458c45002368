//! Session store backends for the single client-local identity record.
//! The file store is the storage-key analogue of the browser profile; the
//! memory store backs tests and the degraded mode when disk is unavailable.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::RwLock;

use super::profile::Identity;

pub trait SessionStore: Send + Sync {
    /// Return the persisted identity if one exists.
    fn load(&self) -> Result<Option<Identity>>;
    /// Persist the identity, replacing any existing record.
    fn save(&self, identity: &Identity) -> Result<()>;
}

/// JSON file at a fixed path, one record per client profile.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path { &self.path }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Identity>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading session file {}", self.path.display()))?;
        let identity = serde_json::from_str::<Identity>(&text)
            .with_context(|| format!("decoding session file {}", self.path.display()))?;
        Ok(Some(identity))
    }

    fn save(&self, identity: &Identity) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).ok();
        }
        let text = serde_json::to_string_pretty(identity)?;
        std::fs::write(&self.path, text)
            .with_context(|| format!("writing session file {}", self.path.display()))?;
        Ok(())
    }
}

/// In-memory store: tests, and the fallback when local storage is unusable.
#[derive(Default)]
pub struct MemorySessionStore {
    slot: RwLock<Option<Identity>>,
}

impl MemorySessionStore {
    pub fn new() -> Self { Self::default() }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Identity>> {
        Ok(self.slot.read().clone())
    }

    fn save(&self, identity: &Identity) -> Result<()> {
        *self.slot.write() = Some(identity.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::AuthMode;
    use chrono::Utc;

    fn sample() -> Identity {
        Identity {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            auth_mode: AuthMode::AnonymousId,
            display_name: Some("Ash".into()),
        }
    }

    #[test]
    fn file_store_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(tmp.path().join("session.json"));
        assert!(store.load().unwrap().is_none());

        let me = sample();
        store.save(&me).unwrap();
        assert_eq!(store.load().unwrap(), Some(me.clone()));

        // Save replaces, never duplicates: exactly one record per store.
        let other = sample();
        store.save(&other).unwrap();
        assert_eq!(store.load().unwrap(), Some(other));
    }

    #[test]
    fn file_store_rejects_corrupt_record() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = FileSessionStore::new(&path);
        assert!(store.load().is_err());
    }

    #[test]
    fn memory_store_roundtrip() {
        let store = MemorySessionStore::new();
        assert!(store.load().unwrap().is_none());
        let me = sample();
        store.save(&me).unwrap();
        assert_eq!(store.load().unwrap(), Some(me));
    }
}
