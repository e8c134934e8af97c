//! Scope policy: which permission unlocks which scope

use super::oracle::{Permission, PermissionSet, names};
use crate::scope::{Scope, ScopeSet};
use std::collections::HashMap;

/// Table of restricted scopes and the permission each one requires
///
/// Scopes absent from the table are unrestricted and always permitted.
#[derive(Debug, Clone)]
pub struct ScopePolicy {
    restricted: HashMap<Scope, Permission>,
}

impl Default for ScopePolicy {
    fn default() -> Self {
        Self::unrestricted()
            .require(Scope::Read, names::READ_MESSAGES)
            .require(Scope::PrivateRead, names::READ_PRIVATE_CHANNELS)
            .require(Scope::Write, names::POST_MESSAGE)
            .require(Scope::ManageBot, names::MANAGE_BOT)
    }
}

impl ScopePolicy {
    /// Policy where every scope is permitted
    pub fn unrestricted() -> Self {
        Self {
            restricted: HashMap::new(),
        }
    }

    /// Builder: make `scope` require `permission`
    pub fn require(mut self, scope: Scope, permission: &str) -> Self {
        self.restricted.insert(scope, Permission::new(permission));
        self
    }

    /// Permission that unlocks `scope`, if it is restricted
    pub fn required_permission(&self, scope: Scope) -> Option<&Permission> {
        self.restricted.get(&scope)
    }

    /// Every scope a holder of `permissions` may ever receive, in canonical order
    pub fn permitted_scopes(&self, permissions: &PermissionSet) -> ScopeSet {
        Scope::ALL
            .iter()
            .copied()
            .filter(|scope| match self.required_permission(*scope) {
                Some(required) => permissions.contains(required),
                None => true,
            })
            .collect()
    }
}
