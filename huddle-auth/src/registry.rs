//! Client registry
//!
//! Registration, authentication and owner-scoped management of third-party
//! clients. Deleting a client cascades into the revocation service before the
//! record disappears.

use crate::crypto::{SecretDigest, generate_client_id, generate_secure_key};
use crate::error::AuthError;
use crate::models::{Actor, Client, RevokedCount};
use crate::permissions::{PermissionOracle, PermissionSet, ScopePolicy, names};
use crate::revocation::RevocationService;
use crate::scope::ScopeSet;
use crate::storage::OAuthStorage;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::{Host, Url};
use uuid::Uuid;

pub const MAX_NAME_LENGTH: usize = 32;
pub const MAX_DESCRIPTION_LENGTH: usize = 1000;

/// Registration input
#[derive(Debug, Clone)]
pub struct NewClient {
    pub name: String,
    pub description: String,
    pub redirect_uris: Vec<String>,
    pub scopes: ScopeSet,
    pub confidential: bool,
}

/// Partial update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct ClientPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub redirect_uris: Option<Vec<String>>,
    /// Transfer ownership
    pub owner_id: Option<Uuid>,
}

/// A freshly registered client and its plaintext secret, shown exactly once
#[derive(Debug, Clone)]
pub struct RegisteredClient {
    pub client: Client,
    pub client_secret: Option<String>,
}

pub struct ClientRegistry {
    storage: Arc<dyn OAuthStorage>,
    revocation: Arc<RevocationService>,
    oracle: Arc<dyn PermissionOracle>,
    policy: Arc<ScopePolicy>,
}

impl ClientRegistry {
    pub fn new(
        storage: Arc<dyn OAuthStorage>,
        revocation: Arc<RevocationService>,
        oracle: Arc<dyn PermissionOracle>,
        policy: Arc<ScopePolicy>,
    ) -> Self {
        Self {
            storage,
            revocation,
            oracle,
            policy,
        }
    }

    pub async fn register(&self, owner: &Actor, new: NewClient) -> Result<RegisteredClient, AuthError> {
        if !self.oracle.has_permission(&owner.role, names::CREATE_CLIENT) {
            return Err(AuthError::forbidden("Role may not register clients"));
        }
        validate_name(&new.name)?;
        validate_description(&new.description)?;
        validate_redirect_uris(&new.redirect_uris)?;
        if new.scopes.is_empty() {
            return Err(AuthError::validation("At least one scope is required"));
        }

        let client_secret = new.confidential.then(generate_secure_key);
        let now = Utc::now();
        let client = Client {
            id: generate_client_id(),
            name: new.name,
            description: new.description,
            owner_id: owner.user_id,
            secret_digest: client_secret.as_deref().map(SecretDigest::new),
            redirect_uris: new.redirect_uris,
            scopes: new.scopes,
            confidential: new.confidential,
            created_at: now,
            updated_at: now,
        };
        self.storage.save_client(&client).await?;

        info!(
            client_id = %client.id,
            user_id = %owner.user_id,
            confidential = client.confidential,
            "Client registered"
        );
        Ok(RegisteredClient {
            client,
            client_secret,
        })
    }

    /// Authenticate a client at the token, revocation or introspection endpoint
    pub async fn authenticate(&self, client_id: &str, secret: Option<&str>) -> Result<Client, AuthError> {
        let Some(client) = self.storage.find_client(client_id).await? else {
            debug!(client_id = %client_id, "Unknown client");
            return Err(AuthError::invalid_client("Unknown client"));
        };

        match (&client.secret_digest, secret) {
            (Some(digest), Some(secret)) if digest.verify(secret) => {}
            (Some(_), Some(_)) => {
                warn!(client_id = %client_id, "Client secret mismatch");
                return Err(AuthError::invalid_client("Client authentication failed"));
            }
            (Some(_), None) => return Err(AuthError::invalid_client("Client secret required")),
            (None, Some(_)) => {
                return Err(AuthError::invalid_client(
                    "Public clients must not present a secret",
                ));
            }
            (None, None) => {}
        }
        Ok(client)
    }

    /// Public lookup
    pub async fn get(&self, client_id: &str) -> Result<Client, AuthError> {
        self.storage
            .find_client(client_id)
            .await?
            .ok_or_else(|| AuthError::not_found(format!("Client {client_id} not found")))
    }

    /// Full record, for the owner or an admin
    pub async fn get_detail(&self, client_id: &str, actor: &Actor) -> Result<Client, AuthError> {
        let client = self.get(client_id).await?;
        self.ensure_can_manage(&client, actor)?;
        Ok(client)
    }

    /// The actor's own clients, or every client when `all` is set
    pub async fn list(&self, actor: &Actor, all: bool) -> Result<Vec<Client>, AuthError> {
        let clients = if all {
            self.storage.list_clients().await?
        } else {
            self.storage.find_clients_by_owner(actor.user_id).await?
        };
        Ok(clients)
    }

    pub async fn update(
        &self,
        client_id: &str,
        patch: ClientPatch,
        actor: &Actor,
    ) -> Result<Client, AuthError> {
        let mut client = self.get(client_id).await?;
        self.ensure_can_manage(&client, actor)?;

        if let Some(name) = patch.name {
            validate_name(&name)?;
            client.name = name;
        }
        if let Some(description) = patch.description {
            validate_description(&description)?;
            client.description = description;
        }
        if let Some(redirect_uris) = patch.redirect_uris {
            validate_redirect_uris(&redirect_uris)?;
            client.redirect_uris = redirect_uris;
        }
        if let Some(owner_id) = patch.owner_id {
            if owner_id.is_nil() {
                return Err(AuthError::validation("New owner must not be nil"));
            }
            if owner_id != client.owner_id {
                info!(client_id = %client_id, from = %client.owner_id, to = %owner_id, "Client ownership transferred");
            }
            client.owner_id = owner_id;
        }
        client.updated_at = Utc::now();

        self.storage.save_client(&client).await?;
        debug!(client_id = %client_id, user_id = %actor.user_id, "Client updated");
        Ok(client)
    }

    /// Delete a client, then revoke everything issued to it
    ///
    /// The client record goes first so no new token can be minted for it
    /// once the revocation sweep has started.
    pub async fn delete(&self, client_id: &str, actor: &Actor) -> Result<RevokedCount, AuthError> {
        let client = self.get(client_id).await?;
        self.ensure_can_manage(&client, actor)?;

        self.storage.delete_client(client_id).await?;
        let revoked = self.revocation.revoke_all_for_client(client_id).await?;

        warn!(
            client_id = %client_id,
            user_id = %actor.user_id,
            revoked = revoked.total(),
            "Client deleted"
        );
        Ok(revoked)
    }

    /// Replace a confidential client's secret; the new plaintext is returned once
    pub async fn rotate_secret(&self, client_id: &str, actor: &Actor) -> Result<String, AuthError> {
        let mut client = self.get(client_id).await?;
        self.ensure_can_manage(&client, actor)?;
        if client.is_public() {
            return Err(AuthError::validation("Public clients have no secret"));
        }

        let secret = generate_secure_key();
        client.secret_digest = Some(SecretDigest::new(&secret));
        client.updated_at = Utc::now();
        self.storage.save_client(&client).await?;

        info!(client_id = %client_id, user_id = %actor.user_id, "Client secret rotated");
        Ok(secret)
    }

    /// Client scopes a holder of `permissions` could be granted; may be empty
    pub fn available_scopes(&self, client: &Client, permissions: &PermissionSet) -> ScopeSet {
        client.scopes.intersect(&self.policy.permitted_scopes(permissions))
    }

    pub fn is_admin(&self, actor: &Actor) -> bool {
        self.oracle
            .has_permission(&actor.role, names::MANAGE_OTHERS_CLIENT)
    }

    fn ensure_can_manage(&self, client: &Client, actor: &Actor) -> Result<(), AuthError> {
        if client.is_owned_by(actor.user_id) || self.is_admin(actor) {
            Ok(())
        } else {
            debug!(client_id = %client.id, user_id = %actor.user_id, "Management of foreign client refused");
            Err(AuthError::forbidden("Only the owner or an admin may manage this client"))
        }
    }
}

fn validate_name(name: &str) -> Result<(), AuthError> {
    let len = name.chars().count();
    if len == 0 || len > MAX_NAME_LENGTH {
        return Err(AuthError::validation(format!(
            "Name must be 1 to {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), AuthError> {
    let len = description.chars().count();
    if len == 0 || len > MAX_DESCRIPTION_LENGTH {
        return Err(AuthError::validation(format!(
            "Description must be 1 to {MAX_DESCRIPTION_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_redirect_uris(uris: &[String]) -> Result<(), AuthError> {
    if uris.is_empty() {
        return Err(AuthError::validation("At least one redirect URI is required"));
    }
    uris.iter().try_for_each(|uri| validate_redirect_uri(uri))
}

/// Schemes a browser would execute or read locally instead of handing off
const FORBIDDEN_REDIRECT_SCHEMES: &[&str] = &["javascript", "data", "file", "vbscript", "blob"];

/// Absolute `https` URIs, `http` on a loopback host, or a native app's
/// custom scheme; never a fragment
pub fn validate_redirect_uri(uri: &str) -> Result<(), AuthError> {
    let url = Url::parse(uri)
        .map_err(|e| AuthError::validation(format!("Invalid redirect URI {uri}: {e}")))?;

    if url.fragment().is_some() {
        return Err(AuthError::validation("Redirect URI must not contain a fragment"));
    }

    let allowed = match url.scheme() {
        "https" => url.host().is_some(),
        "http" => match url.host() {
            Some(Host::Domain(domain)) => domain == "localhost",
            Some(Host::Ipv4(ip)) => ip.is_loopback(),
            Some(Host::Ipv6(ip)) => ip.is_loopback(),
            None => false,
        },
        scheme => !FORBIDDEN_REDIRECT_SCHEMES.contains(&scheme),
    };

    if allowed {
        Ok(())
    } else {
        Err(AuthError::validation(format!(
            "Redirect URI must be https, loopback http or an app scheme: {uri}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{Role, StaticPermissionOracle};
    use crate::storage::InMemoryOAuthStorage;
    use assert_matches::assert_matches;

    fn registry() -> ClientRegistry {
        let storage: Arc<dyn OAuthStorage> = Arc::new(InMemoryOAuthStorage::new());
        ClientRegistry::new(
            Arc::clone(&storage),
            Arc::new(RevocationService::new(storage)),
            Arc::new(StaticPermissionOracle::standard()),
            Arc::new(ScopePolicy::default()),
        )
    }

    fn new_client(confidential: bool) -> NewClient {
        NewClient {
            name: "Standup Bot".to_string(),
            description: "Posts the daily standup".to_string(),
            redirect_uris: vec!["https://bot.example.com/callback".to_string()],
            scopes: ScopeSet::parse("read write").unwrap(),
            confidential,
        }
    }

    fn user() -> Actor {
        Actor::new(Uuid::new_v4(), Role::user())
    }

    #[tokio::test]
    async fn test_register_confidential_returns_secret_once() {
        let registry = registry();
        let owner = user();
        let registered = registry.register(&owner, new_client(true)).await.unwrap();

        let secret = registered.client_secret.unwrap();
        assert!(registered.client.secret_digest.is_some());
        assert_eq!(registered.client.owner_id, owner.user_id);

        let stored = registry.get(&registered.client.id).await.unwrap();
        assert!(stored.secret_digest.unwrap().verify(&secret));
    }

    #[tokio::test]
    async fn test_register_public_has_no_secret() {
        let registry = registry();
        let registered = registry.register(&user(), new_client(false)).await.unwrap();
        assert!(registered.client_secret.is_none());
        assert!(registered.client.secret_digest.is_none());
    }

    #[tokio::test]
    async fn test_register_validation() {
        let registry = registry();
        let owner = user();

        let mut bad = new_client(false);
        bad.name = "x".repeat(33);
        assert_matches!(registry.register(&owner, bad).await, Err(AuthError::Validation(_)));

        let mut bad = new_client(false);
        bad.name = String::new();
        assert_matches!(registry.register(&owner, bad).await, Err(AuthError::Validation(_)));

        let mut bad = new_client(false);
        bad.description = String::new();
        assert_matches!(registry.register(&owner, bad).await, Err(AuthError::Validation(_)));

        let mut bad = new_client(false);
        bad.redirect_uris.clear();
        assert_matches!(registry.register(&owner, bad).await, Err(AuthError::Validation(_)));

        let mut bad = new_client(false);
        bad.scopes = ScopeSet::new();
        assert_matches!(registry.register(&owner, bad).await, Err(AuthError::Validation(_)));

        let mut ok = new_client(false);
        ok.name = "x".repeat(32);
        assert!(registry.register(&owner, ok).await.is_ok());
    }

    #[tokio::test]
    async fn test_bot_role_may_not_register() {
        let registry = registry();
        let bot = Actor::new(Uuid::new_v4(), Role::bot());
        assert_matches!(
            registry.register(&bot, new_client(false)).await,
            Err(AuthError::Forbidden(_))
        );
    }

    #[test]
    fn test_redirect_uri_rules() {
        assert!(validate_redirect_uri("https://app.example.com/cb").is_ok());
        assert!(validate_redirect_uri("https://app.example.com/cb?tenant=1").is_ok());
        assert!(validate_redirect_uri("http://localhost:8080/cb").is_ok());
        assert!(validate_redirect_uri("http://127.0.0.1/cb").is_ok());
        assert!(validate_redirect_uri("http://[::1]:9000/cb").is_ok());

        assert!(validate_redirect_uri("http://app.example.com/cb").is_err());
        assert!(validate_redirect_uri("https://app.example.com/cb#frag").is_err());
        assert!(validate_redirect_uri("javascript:alert(1)").is_err());
        assert!(validate_redirect_uri("data:text/html,hi").is_err());
        assert!(validate_redirect_uri("file:///etc/passwd").is_err());
        assert!(validate_redirect_uri("vbscript:msgbox(1)").is_err());
        assert!(validate_redirect_uri("blob:https://app.example.com/uuid").is_err());
        assert!(validate_redirect_uri("/relative/cb").is_err());

        // Native apps register their own scheme
        assert!(validate_redirect_uri("myapp://callback").is_ok());
        assert!(validate_redirect_uri("com.example.app:/oauth2redirect").is_ok());
        assert!(validate_redirect_uri("myapp://callback#frag").is_err());
    }

    #[tokio::test]
    async fn test_authenticate() {
        let registry = registry();
        let owner = user();
        let confidential = registry.register(&owner, new_client(true)).await.unwrap();
        let public = registry.register(&owner, new_client(false)).await.unwrap();
        let secret = confidential.client_secret.as_deref();

        assert!(registry.authenticate(&confidential.client.id, secret).await.is_ok());
        assert_matches!(
            registry.authenticate(&confidential.client.id, Some("wrong")).await,
            Err(AuthError::InvalidClient(_))
        );
        assert_matches!(
            registry.authenticate(&confidential.client.id, None).await,
            Err(AuthError::InvalidClient(_))
        );
        assert!(registry.authenticate(&public.client.id, None).await.is_ok());
        assert_matches!(
            registry.authenticate(&public.client.id, Some("anything")).await,
            Err(AuthError::InvalidClient(_))
        );
        assert_matches!(
            registry.authenticate("missing", None).await,
            Err(AuthError::InvalidClient(_))
        );
    }

    #[tokio::test]
    async fn test_update_permissions() {
        let registry = registry();
        let owner = user();
        let stranger = user();
        let admin = Actor::new(Uuid::new_v4(), Role::admin());
        let id = registry.register(&owner, new_client(false)).await.unwrap().client.id;

        let patch = ClientPatch {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };
        assert_matches!(
            registry.update(&id, patch.clone(), &stranger).await,
            Err(AuthError::Forbidden(_))
        );
        assert_eq!(registry.update(&id, patch, &owner).await.unwrap().name, "Renamed");

        let transfer = ClientPatch {
            owner_id: Some(stranger.user_id),
            ..Default::default()
        };
        let updated = registry.update(&id, transfer, &admin).await.unwrap();
        assert_eq!(updated.owner_id, stranger.user_id);

        // The previous owner lost control
        assert_matches!(
            registry.get_detail(&id, &owner).await,
            Err(AuthError::Forbidden(_))
        );
        assert_matches!(
            registry.update("missing", ClientPatch::default(), &owner).await,
            Err(AuthError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_fields() {
        let registry = registry();
        let owner = user();
        let id = registry.register(&owner, new_client(false)).await.unwrap().client.id;

        for patch in [
            ClientPatch { name: Some(String::new()), ..Default::default() },
            ClientPatch { description: Some(String::new()), ..Default::default() },
            ClientPatch { redirect_uris: Some(vec![]), ..Default::default() },
            ClientPatch { owner_id: Some(Uuid::nil()), ..Default::default() },
        ] {
            assert_matches!(
                registry.update(&id, patch, &owner).await,
                Err(AuthError::Validation(_))
            );
        }
    }

    #[tokio::test]
    async fn test_list_own_and_all() {
        let registry = registry();
        let alice = user();
        let bob = user();
        registry.register(&alice, new_client(false)).await.unwrap();
        registry.register(&bob, new_client(false)).await.unwrap();

        assert_eq!(registry.list(&alice, false).await.unwrap().len(), 1);
        assert_eq!(registry.list(&alice, true).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rotate_secret() {
        let registry = registry();
        let owner = user();
        let registered = registry.register(&owner, new_client(true)).await.unwrap();
        let old = registered.client_secret.unwrap();
        let id = registered.client.id;

        let new = registry.rotate_secret(&id, &owner).await.unwrap();
        assert!(registry.authenticate(&id, Some(&new)).await.is_ok());
        assert!(registry.authenticate(&id, Some(&old)).await.is_err());

        let public = registry.register(&owner, new_client(false)).await.unwrap().client.id;
        assert_matches!(
            registry.rotate_secret(&public, &owner).await,
            Err(AuthError::Validation(_))
        );
    }

    #[tokio::test]
    async fn test_delete() {
        let registry = registry();
        let owner = user();
        let id = registry.register(&owner, new_client(false)).await.unwrap().client.id;

        assert_matches!(registry.delete(&id, &user()).await, Err(AuthError::Forbidden(_)));
        registry.delete(&id, &owner).await.unwrap();
        assert_matches!(registry.get(&id).await, Err(AuthError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_available_scopes() {
        let registry = registry();
        let client = registry.register(&user(), new_client(false)).await.unwrap().client;

        let oracle = StaticPermissionOracle::empty().allow_role(Role::new("reader"), &[names::READ_MESSAGES]);
        let permissions = oracle.permissions_for_role(&Role::new("reader"));
        assert_eq!(registry.available_scopes(&client, &permissions).to_string(), "read");
        assert!(registry.available_scopes(&client, &PermissionSet::new()).is_empty());
    }
}
