use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::entities::{Grant, Permission};
use crate::domain::ports::{Clock, TokenStore};

pub(crate) type GrantTable = Arc<Mutex<HashMap<String, Grant>>>;

// Shared fixed time source for deterministic use-case tests.
pub(crate) struct FixedClock(pub(crate) u64);

impl Clock for FixedClock {
    fn now_epoch_seconds(&self) -> u64 {
        self.0
    }
}

#[derive(Clone, Copy, Default)]
pub(crate) struct FailureFlags {
    pub insert: bool,
    pub get: bool,
}

#[derive(Clone)]
pub(crate) struct RecordingStore {
    grants: GrantTable,
    failures: FailureFlags,
}

impl RecordingStore {
    pub(crate) fn new() -> Self {
        Self {
            grants: Arc::new(Mutex::new(HashMap::new())),
            failures: FailureFlags::default(),
        }
    }

    pub(crate) fn with_failures(mut self, failures: FailureFlags) -> Self {
        self.failures = failures;
        self
    }

    pub(crate) fn insert_test_grant(&self, token: impl Into<String>, expires_at: u64) {
        let grant = Grant {
            permissions: Permission::ALL.to_vec(),
            expires_at,
        };
        let mut guard = self.grants.lock().expect("grants mutex poisoned");
        guard.insert(token.into(), grant);
    }

    pub(crate) fn get_test_grant(&self, token: &str) -> Option<Grant> {
        let guard = self.grants.lock().expect("grants mutex poisoned");
        guard.get(token).cloned()
    }
}

#[async_trait]
impl TokenStore for RecordingStore {
    async fn insert(&self, token: String, grant: Grant) -> Result<(), String> {
        if self.failures.insert {
            return Err("insert failed".to_string());
        }

        let mut guard = self.grants.lock().expect("grants mutex poisoned");
        guard.insert(token, grant);
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<Grant>, String> {
        if self.failures.get {
            return Err("get failed".to_string());
        }

        let guard = self.grants.lock().expect("grants mutex poisoned");
        Ok(guard.get(token).cloned())
    }

    async fn remove(&self, token: &str) -> Result<bool, String> {
        let mut guard = self.grants.lock().expect("grants mutex poisoned");
        Ok(guard.remove(token).is_some())
    }
}
