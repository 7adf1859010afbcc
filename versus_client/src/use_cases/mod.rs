// Use cases layer: lobby state machine, reconciliation, authority and the match task.

pub mod authority;
pub mod powerups;
pub mod reconciler;
pub mod session;
pub mod supervisor;
pub mod versus;

#[cfg(test)]
pub(crate) mod test_support;

pub use authority::{AuthorityEmitter, SNAPSHOT_HZ, SnapshotThrottle, SpawnDirector};
pub use reconciler::{RemoteReconciler, WorldEventQueue};
pub use session::{Session, SessionSettings};
pub use supervisor::{ReconnectDecision, ReconnectPolicy, ReconnectSupervisor};
pub use versus::{MatchOutcome, MatchSettings, VersusMatch};
