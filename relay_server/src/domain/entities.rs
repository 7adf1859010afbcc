// Access grant bound to an issued relay token.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Permission {
    JoinLeaveGroup,
    SendToGroup,
}

impl Permission {
    pub const ALL: [Permission; 2] = [Permission::JoinLeaveGroup, Permission::SendToGroup];
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grant {
    pub permissions: Vec<Permission>,
    // Epoch seconds; the grant is dead at this instant.
    pub expires_at: u64,
}

impl Grant {
    pub fn allows(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

// Group names are opaque to the relay but bounded.
pub const MAX_GROUP_NAME_LEN: usize = 1024;

pub fn is_valid_group_name(group: &str) -> bool {
    !group.trim().is_empty()
        && group.len() <= MAX_GROUP_NAME_LEN
        && !group.chars().any(char::is_control)
}
