//! User directory: who is this user and what role do they hold

use crate::permissions::Role;
use crate::storage::StorageError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Read access to the chat service's user records
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Role of an existing user; `None` for unknown users
    async fn role_of(&self, user_id: Uuid) -> Result<Option<Role>, StorageError>;
}

/// Directory backed by a map, for tests and the demo server
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<Uuid, Role>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used while wiring the directory up
    pub fn with_user(self, user_id: Uuid, role: Role) -> Self {
        let mut users = self.users.into_inner();
        users.insert(user_id, role);
        Self {
            users: RwLock::new(users),
        }
    }

    pub async fn insert(&self, user_id: Uuid, role: Role) {
        self.users.write().await.insert(user_id, role);
    }

    pub async fn remove(&self, user_id: Uuid) -> Option<Role> {
        self.users.write().await.remove(&user_id)
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn role_of(&self, user_id: Uuid) -> Result<Option<Role>, StorageError> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_directory_lookup() {
        let alice = Uuid::new_v4();
        let directory = InMemoryUserDirectory::new().with_user(alice, Role::admin());

        assert_eq!(directory.role_of(alice).await.unwrap(), Some(Role::admin()));
        assert_eq!(directory.role_of(Uuid::new_v4()).await.unwrap(), None);

        directory.insert(alice, Role::user()).await;
        assert_eq!(directory.role_of(alice).await.unwrap(), Some(Role::user()));
        assert_eq!(directory.remove(alice).await, Some(Role::user()));
    }
}
