use async_trait::async_trait;

use crate::domain::entities::Grant;

// Port for access token storage used by relay use cases.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert(&self, token: String, grant: Grant) -> Result<(), String>;
    async fn get(&self, token: &str) -> Result<Option<Grant>, String>;
    async fn remove(&self, token: &str) -> Result<bool, String>;
}

// Port for retrieving the current time.
pub trait Clock: Send + Sync {
    fn now_epoch_seconds(&self) -> u64;
}
