// Group membership and fan-out for connected relay clients.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};

use crate::domain::errors::GroupError;
use crate::domain::is_valid_group_name;

pub type ConnectionId = u64;

/// Per-connection delivery queue; payloads are serialized once and shared.
pub type Outbox = mpsc::UnboundedSender<Arc<str>>;

/// Thread-safe registry of group members.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    /// Map of group name to its members' outboxes.
    groups: RwLock<HashMap<String, HashMap<ConnectionId, Outbox>>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to a group. Joining twice is not an error.
    pub async fn join(
        &self,
        group: &str,
        conn_id: ConnectionId,
        outbox: Outbox,
    ) -> Result<(), GroupError> {
        if !is_valid_group_name(group) {
            return Err(GroupError::InvalidGroup);
        }
        let mut groups = self.groups.write().await;
        groups
            .entry(group.to_string())
            .or_default()
            .insert(conn_id, outbox);
        Ok(())
    }

    /// Removes a connection from a group; empty groups are dropped.
    pub async fn leave(&self, group: &str, conn_id: ConnectionId) -> Result<bool, GroupError> {
        if !is_valid_group_name(group) {
            return Err(GroupError::InvalidGroup);
        }
        let mut groups = self.groups.write().await;
        let Some(members) = groups.get_mut(group) else {
            return Ok(false);
        };
        let removed = members.remove(&conn_id).is_some();
        if members.is_empty() {
            groups.remove(group);
        }
        Ok(removed)
    }

    /// Drops a connection from every group it joined. Returns how many it left.
    pub async fn leave_all(&self, conn_id: ConnectionId) -> usize {
        let mut groups = self.groups.write().await;
        let mut left = 0;
        groups.retain(|_, members| {
            if members.remove(&conn_id).is_some() {
                left += 1;
            }
            !members.is_empty()
        });
        left
    }

    /// Delivers a payload to every member, skipping the sender when `no_echo` is set.
    /// Publishing to a group the sender never joined is allowed.
    pub async fn publish(
        &self,
        group: &str,
        from: ConnectionId,
        no_echo: bool,
        payload: Arc<str>,
    ) -> Result<usize, GroupError> {
        if !is_valid_group_name(group) {
            return Err(GroupError::InvalidGroup);
        }
        let groups = self.groups.read().await;
        let Some(members) = groups.get(group) else {
            return Ok(0);
        };

        let mut delivered = 0;
        for (conn_id, outbox) in members {
            if no_echo && *conn_id == from {
                continue;
            }
            // A closed outbox belongs to a connection that is shutting down.
            if outbox.send(payload.clone()).is_ok() {
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    pub async fn member_count(&self, group: &str) -> usize {
        let groups = self.groups.read().await;
        groups.get(group).map_or(0, HashMap::len)
    }

    pub async fn group_count(&self) -> usize {
        self.groups.read().await.len()
    }
}
