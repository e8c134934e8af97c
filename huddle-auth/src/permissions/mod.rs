//! Role-based permissions and scope resolution
//!
//! Roles and permissions are opaque names. A [`PermissionOracle`] answers which
//! permissions a role carries; a [`ScopePolicy`] decides which scopes those
//! permissions unlock.

pub mod oracle;
pub mod policy;

pub use oracle::{
    Permission, PermissionOracle, PermissionSet, Role, StaticPermissionOracle, names,
};
pub use policy::ScopePolicy;
