use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use super::profile::{AuthMode, Identity};
use super::store::SessionStore;

/// Owns the session store and hands out the one identity for this client.
///
/// The record is created lazily on first access and never duplicated. If the
/// backing store cannot be read or written, the manager degrades to an
/// in-memory identity for the current run rather than failing the caller.
pub struct IdentityManager {
    store: Arc<dyn SessionStore>,
    cache: RwLock<Option<Identity>>,
    degraded: RwLock<bool>,
}

impl IdentityManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store, cache: RwLock::new(None), degraded: RwLock::new(false) }
    }

    /// Return the current identity, creating a default anonymous-id one on
    /// first access. Never fails: storage trouble flips the manager into
    /// degraded (unpersisted) mode for the rest of the run.
    pub fn current(&self) -> Identity {
        if let Some(me) = self.cache.read().clone() {
            return me;
        }
        match self.store.load() {
            Ok(Some(me)) => {
                debug!(target: "identity", id = %me.id, "loaded persisted identity");
                *self.cache.write() = Some(me.clone());
                me
            }
            Ok(None) => self.create(AuthMode::AnonymousId, None),
            Err(e) => {
                warn!(target: "identity", error = %e, "session store unreadable, using in-memory identity");
                *self.degraded.write() = true;
                let me = fresh_identity(AuthMode::AnonymousId, None);
                *self.cache.write() = Some(me.clone());
                me
            }
        }
    }

    /// Explicit creation during onboarding. Overwrites any existing record;
    /// authorship links made under the previous id are abandoned.
    pub fn create(&self, auth_mode: AuthMode, display_name: Option<String>) -> Identity {
        let me = fresh_identity(auth_mode, display_name);
        if let Err(e) = self.store.save(&me) {
            warn!(target: "identity", error = %e, "session store unwritable, identity not persisted");
            *self.degraded.write() = true;
        }
        debug!(target: "identity", id = %me.id, mode = ?me.auth_mode, "created identity");
        *self.cache.write() = Some(me.clone());
        me
    }

    /// Patch the display name on the persisted record. The id and auth mode
    /// are immutable; only the label changes.
    pub fn set_display_name(&self, name: &str) -> Identity {
        let mut me = self.current();
        me.display_name = if name.trim().is_empty() { None } else { Some(name.trim().to_string()) };
        if let Err(e) = self.store.save(&me) {
            warn!(target: "identity", error = %e, "display name not persisted");
            *self.degraded.write() = true;
        }
        *self.cache.write() = Some(me.clone());
        me
    }

    /// True when the identity only lives in memory for this run.
    pub fn is_degraded(&self) -> bool { *self.degraded.read() }

    /// Authorship check against a resource's stored author id.
    pub fn is_author(&self, author_id: Option<&str>) -> bool {
        self.current().is_author(author_id)
    }
}

fn fresh_identity(auth_mode: AuthMode, display_name: Option<String>) -> Identity {
    Identity {
        // 128-bit random id; collision-free in practice across clients.
        id: Uuid::new_v4().to_string(),
        created_at: Utc::now(),
        auth_mode,
        display_name: display_name.filter(|n| !n.trim().is_empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::store::{MemorySessionStore, SessionStore};
    use anyhow::{Result, anyhow};

    #[test]
    fn current_is_idempotent() {
        let mgr = IdentityManager::new(Arc::new(MemorySessionStore::new()));
        let a = mgr.current();
        let b = mgr.current();
        assert_eq!(a.id, b.id);
        assert_eq!(a.auth_mode, AuthMode::AnonymousId);
        assert!(!mgr.is_degraded());
    }

    #[test]
    fn create_overwrites_and_changes_id() {
        let store = Arc::new(MemorySessionStore::new());
        let mgr = IdentityManager::new(store.clone());
        let first = mgr.current();
        let second = mgr.create(AuthMode::SecretKey, Some("Misty".into()));
        assert_ne!(first.id, second.id);
        assert_eq!(store.load().unwrap().unwrap().id, second.id);
        assert_eq!(mgr.current().auth_mode, AuthMode::SecretKey);
    }

    #[test]
    fn display_name_patch_keeps_id() {
        let mgr = IdentityManager::new(Arc::new(MemorySessionStore::new()));
        let before = mgr.current();
        let after = mgr.set_display_name("Brock");
        assert_eq!(before.id, after.id);
        assert_eq!(after.display_name.as_deref(), Some("Brock"));
        assert_eq!(mgr.set_display_name("  ").display_name, None);
    }

    struct BrokenStore;
    impl SessionStore for BrokenStore {
        fn load(&self) -> Result<Option<Identity>> { Err(anyhow!("disk on fire")) }
        fn save(&self, _identity: &Identity) -> Result<()> { Err(anyhow!("disk on fire")) }
    }

    #[test]
    fn broken_store_degrades_but_stays_stable() {
        let mgr = IdentityManager::new(Arc::new(BrokenStore));
        let a = mgr.current();
        let b = mgr.current();
        // Same in-memory identity for the whole run, flagged as degraded.
        assert_eq!(a.id, b.id);
        assert!(mgr.is_degraded());
    }
}
