//! Application context: the identity manager and gateway handle, built once
//! at startup and passed to whatever needs them. No hidden singleton, so
//! tests can substitute a throwaway identity and an in-process gateway.

use std::sync::Arc;

use crate::config::Config;
use crate::gateway::{Gateway, MemoryGateway, RestGateway};
use crate::identity::{FileSessionStore, IdentityManager, MemorySessionStore};

#[derive(Clone)]
pub struct AppContext {
    pub identity: Arc<IdentityManager>,
    pub gateway: Arc<dyn Gateway>,
}

impl AppContext {
    /// Production wiring: file-backed session store, REST gateway.
    pub fn from_config(config: &Config) -> crate::error::AppResult<Self> {
        let store = Arc::new(FileSessionStore::new(&config.session_file));
        let gateway = RestGateway::new(&config.gateway_url, &config.api_key, &config.media_bucket)?;
        Ok(Self {
            identity: Arc::new(IdentityManager::new(store)),
            gateway: Arc::new(gateway),
        })
    }

    /// Test wiring: everything in memory.
    pub fn in_memory() -> Self {
        Self {
            identity: Arc::new(IdentityManager::new(Arc::new(MemorySessionStore::new()))),
            gateway: Arc::new(MemoryGateway::new()),
        }
    }
}
