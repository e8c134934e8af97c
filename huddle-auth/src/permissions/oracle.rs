//! Role to permission lookup

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

/// Well-known permission names
pub mod names {
    pub const READ_MESSAGES: &str = "read_messages";
    pub const READ_PRIVATE_CHANNELS: &str = "read_private_channels";
    pub const POST_MESSAGE: &str = "post_message";
    pub const MANAGE_BOT: &str = "manage_bot";
    pub const CREATE_CLIENT: &str = "create_client";
    /// Grants management of clients owned by other users
    pub const MANAGE_OTHERS_CLIENT: &str = "manage_others_client";
}

/// Opaque role name such as `user`, `admin` or `bot`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn user() -> Self {
        Self::new("user")
    }

    pub fn admin() -> Self {
        Self::new("admin")
    }

    pub fn bot() -> Self {
        Self::new("bot")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque permission name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(String);

impl Permission {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Permission {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type PermissionSet = HashSet<Permission>;

/// Read-only mapping from a role to its permissions
///
/// Implementations must be pure: the same role always yields the same set
/// for the lifetime of the oracle.
pub trait PermissionOracle: Send + Sync {
    /// Permissions carried by `role`; unknown roles carry none
    fn permissions_for_role(&self, role: &Role) -> PermissionSet;

    fn has_permission(&self, role: &Role, permission: &str) -> bool {
        self.permissions_for_role(role)
            .contains(&Permission::new(permission))
    }
}

/// Oracle backed by a fixed role table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticPermissionOracle {
    roles: HashMap<Role, PermissionSet>,
}

impl StaticPermissionOracle {
    /// Oracle with no roles at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// The stock chat roles
    pub fn standard() -> Self {
        use names::*;

        Self::empty()
            .allow_role(
                Role::user(),
                &[READ_MESSAGES, READ_PRIVATE_CHANNELS, POST_MESSAGE, CREATE_CLIENT],
            )
            .allow_role(
                Role::admin(),
                &[
                    READ_MESSAGES,
                    READ_PRIVATE_CHANNELS,
                    POST_MESSAGE,
                    MANAGE_BOT,
                    CREATE_CLIENT,
                    MANAGE_OTHERS_CLIENT,
                ],
            )
            .allow_role(Role::bot(), &[READ_MESSAGES, POST_MESSAGE])
    }

    /// Builder: add permissions to a role
    pub fn allow_role(mut self, role: Role, permissions: &[&str]) -> Self {
        self.roles
            .entry(role)
            .or_default()
            .extend(permissions.iter().map(|p| Permission::new(*p)));
        self
    }
}

impl PermissionOracle for StaticPermissionOracle {
    fn permissions_for_role(&self, role: &Role) -> PermissionSet {
        let permissions = self.roles.get(role).cloned().unwrap_or_default();
        debug!(role = %role, count = permissions.len(), "Resolved role permissions");
        permissions
    }
}
