use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

use crate::domain::entities::Grant;
use crate::domain::ports::{Clock, TokenStore};
use crate::use_cases::GroupRegistry;

// Application state shared by the HTTP and websocket handlers.
#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<Mutex<HashMap<String, Grant>>>,
    pub groups: Arc<GroupRegistry>,
    // Websocket base handed out by negotiate, e.g. `ws://127.0.0.1:7071`.
    pub public_url: Arc<str>,
    pub token_ttl_seconds: u64,
}

impl AppState {
    pub fn new(public_url: impl Into<Arc<str>>, token_ttl_seconds: u64) -> Self {
        Self {
            tokens: Arc::new(Mutex::new(HashMap::new())),
            groups: Arc::new(GroupRegistry::new()),
            public_url: public_url.into(),
            token_ttl_seconds,
        }
    }

    pub fn token_store(&self) -> InMemoryTokenStore {
        InMemoryTokenStore {
            tokens: self.tokens.clone(),
        }
    }
}

// In-memory token store adapter for the relay.
#[derive(Clone)]
pub struct InMemoryTokenStore {
    pub tokens: Arc<Mutex<HashMap<String, Grant>>>,
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn insert(&self, token: String, grant: Grant) -> Result<(), String> {
        let mut tokens = self.tokens.lock().await;
        tokens.insert(token, grant);
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<Grant>, String> {
        let tokens = self.tokens.lock().await;
        Ok(tokens.get(token).cloned())
    }

    async fn remove(&self, token: &str) -> Result<bool, String> {
        let mut tokens = self.tokens.lock().await;
        Ok(tokens.remove(token).is_some())
    }
}

// System clock adapter used by relay use cases.
#[derive(Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_seconds(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}
