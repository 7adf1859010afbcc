use crate::domain::entities::Grant;
use crate::domain::errors::AccessError;
use crate::domain::ports::{Clock, TokenStore};

// Access token verification use case with injected dependencies.
pub struct VerifyTokenUseCase<C, S> {
    pub clock: C,
    pub store: S,
}

impl<C, S> VerifyTokenUseCase<C, S>
where
    C: Clock,
    S: TokenStore,
{
    pub async fn execute(&self, token: &str) -> Result<Grant, AccessError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AccessError::InvalidToken);
        }

        let grant = self
            .store
            .get(token)
            .await
            .map_err(|_| AccessError::StorageFailure)?
            .ok_or(AccessError::InvalidToken)?;

        if grant.expires_at <= self.clock.now_epoch_seconds() {
            // Best-effort cleanup of the dead token.
            let _ = self.store.remove(token).await;
            return Err(AccessError::TokenExpired);
        }

        Ok(grant)
    }
}
