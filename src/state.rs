use std::sync::Arc;

use crate::auth::store::{MemoryStore, UserStore};
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let store = Arc::new(MemoryStore::new()) as Arc<dyn UserStore>;
        Ok(Self { store, config })
    }

    pub fn from_parts(store: Arc<dyn UserStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    /// State with a fresh empty store and fixed test config; no environment
    /// needed.
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            jwt: crate::config::JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
        });
        let store = Arc::new(MemoryStore::new()) as Arc<dyn UserStore>;
        Self { store, config }
    }
}
