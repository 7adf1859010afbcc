pub mod groups;
pub mod issue_token;
pub mod verify_token;

#[cfg(test)]
pub(crate) mod test_support;

pub use groups::{ConnectionId, GroupRegistry, Outbox};
pub use issue_token::{IssueTokenUseCase, IssuedToken};
pub use verify_token::VerifyTokenUseCase;
