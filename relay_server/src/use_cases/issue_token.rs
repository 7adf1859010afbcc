use uuid::Uuid;

use crate::domain::entities::{Grant, Permission};
use crate::domain::errors::AccessError;
use crate::domain::ports::{Clock, TokenStore};

// Response returned by the token issuing use case.
pub struct IssuedToken {
    pub token: String,
    pub expires_at: u64,
}

// Issues a group-messaging access token with a bounded lifetime.
pub struct IssueTokenUseCase<C, S> {
    pub clock: C,
    pub store: S,
    pub ttl_seconds: u64,
}

impl<C, S> IssueTokenUseCase<C, S>
where
    C: Clock,
    S: TokenStore,
{
    pub async fn execute(&self) -> Result<IssuedToken, AccessError> {
        let token = Uuid::new_v4().simple().to_string();
        let expires_at = self.clock.now_epoch_seconds() + self.ttl_seconds;

        let grant = Grant {
            permissions: Permission::ALL.to_vec(),
            expires_at,
        };

        self.store
            .insert(token.clone(), grant)
            .await
            .map_err(|_| AccessError::StorageFailure)?;

        Ok(IssuedToken { token, expires_at })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::test_support::{FailureFlags, FixedClock, RecordingStore};

    #[tokio::test]
    async fn when_token_is_issued_then_grant_is_stored_with_ttl_and_both_permissions() {
        let store = RecordingStore::new();
        let use_case = IssueTokenUseCase {
            clock: FixedClock(1_700_000_000),
            store: store.clone(),
            ttl_seconds: 3600,
        };

        let issued = use_case.execute().await.expect("expected token to be issued");

        assert_eq!(issued.expires_at, 1_700_003_600);
        let grant = store
            .get_test_grant(&issued.token)
            .expect("expected grant to be stored");
        assert!(grant.allows(Permission::JoinLeaveGroup));
        assert!(grant.allows(Permission::SendToGroup));
        assert_eq!(grant.expires_at, issued.expires_at);
    }

    #[tokio::test]
    async fn when_tokens_are_issued_twice_then_they_differ() {
        let use_case = IssueTokenUseCase {
            clock: FixedClock(1_700_000_000),
            store: RecordingStore::new(),
            ttl_seconds: 60,
        };

        let first = use_case.execute().await.expect("first token");
        let second = use_case.execute().await.expect("second token");

        assert_ne!(first.token, second.token);
    }

    #[tokio::test]
    async fn when_store_insert_fails_then_returns_storage_failure() {
        let use_case = IssueTokenUseCase {
            clock: FixedClock(1_700_000_000),
            store: RecordingStore::new().with_failures(FailureFlags {
                insert: true,
                ..FailureFlags::default()
            }),
            ttl_seconds: 60,
        };

        let result = use_case.execute().await;

        assert!(matches!(result, Err(AccessError::StorageFailure)));
    }
}
