//! Grant coordinator: the OAuth2 grant state machines
//!
//! An authorization attempt moves `Requested -> Approved | Denied -> Issued |
//! Rejected`. [`GrantCoordinator::validate_authorization`] produces a
//! [`PendingAuthorization`]; [`PendingAuthorization::approve`] and
//! [`PendingAuthorization::deny`] consume it, so a decision is applied once.
//!
//! Token endpoint grants (code exchange, refresh rotation, client credentials)
//! take an already authenticated [`Client`].

use crate::crypto::fingerprint;
use crate::error::AuthError;
use crate::models::{AccessToken, Actor, Client, FamilyId, RefreshToken};
use crate::permissions::{PermissionOracle, PermissionSet, ScopePolicy};
use crate::pkce::{PkceChallenge, PkceMethod, validate_code_challenge};
use crate::registry::ClientRegistry;
use crate::revocation::RevocationService;
use crate::scope::ScopeSet;
use crate::storage::ConsumeOutcome;
use crate::tokens::{NewCode, TokenStore};
use crate::users::UserDirectory;
use chrono::Utc;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// `response_type` values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    Code,
    /// Legacy implicit grant
    Token,
}

/// Parameters of an authorization request (RFC 6749 §4.1.1, RFC 7636 §4.3)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizationRequest {
    pub response_type: String,
    pub client_id: String,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
}

/// Where errors and results of a verified request are delivered
#[derive(Debug, Clone)]
struct RedirectTarget {
    redirect_uri: String,
    state: Option<String>,
    in_fragment: bool,
}

impl RedirectTarget {
    fn build(&self, params: &[(&str, &str)]) -> Result<Url, AuthError> {
        let mut url = Url::parse(&self.redirect_uri)
            .map_err(|e| AuthError::invalid_request(format!("Invalid redirect_uri: {e}")))?;

        let state = self.state.as_deref().map(|state| ("state", state));
        let pairs = params.iter().copied().chain(state);

        if self.in_fragment {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish();
            url.set_fragment(Some(&encoded));
        } else {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url)
    }
}

/// Authorization endpoint failure
///
/// Failures detected before the client and redirect URI are verified carry no
/// redirect and must be shown to the user directly.
#[derive(Debug)]
pub struct AuthorizeError {
    pub error: AuthError,
    redirect_to: Option<Url>,
}

impl AuthorizeError {
    fn direct(error: AuthError) -> Self {
        Self {
            error,
            redirect_to: None,
        }
    }

    fn redirected(error: AuthError, target: &RedirectTarget) -> Self {
        let description = error.description();
        let redirect_to = target
            .build(&[
                ("error", error.error_code()),
                ("error_description", description.as_str()),
            ])
            .ok();
        Self { error, redirect_to }
    }

    /// Redirect carrying `error`, `error_description` and `state`, if deliverable
    pub fn redirect_location(&self) -> Option<&Url> {
        self.redirect_to.as_ref()
    }
}

impl fmt::Display for AuthorizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for AuthorizeError {}

/// A verified request awaiting the resource owner's decision
#[derive(Debug)]
pub struct PendingAuthorization {
    client: Client,
    user: Actor,
    response_type: ResponseType,
    scopes: ScopeSet,
    pkce: Option<PkceChallenge>,
    target: RedirectTarget,
}

impl PendingAuthorization {
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn user(&self) -> &Actor {
        &self.user
    }

    pub fn response_type(&self) -> ResponseType {
        self.response_type
    }

    /// Scopes that will be granted on approval
    pub fn scopes(&self) -> &ScopeSet {
        &self.scopes
    }

    pub fn redirect_uri(&self) -> &str {
        &self.target.redirect_uri
    }

    pub fn state(&self) -> Option<&str> {
        self.target.state.as_deref()
    }

    pub fn approve(self) -> ApprovedAuthorization {
        ApprovedAuthorization { pending: self }
    }

    /// Redirect carrying `error=access_denied`
    pub fn deny(self) -> Result<Url, AuthError> {
        debug!(client_id = %self.client.id, user_id = %self.user.user_id, "Authorization denied by user");
        let denied = AuthError::AccessDenied;
        self.target.build(&[
            ("error", denied.error_code()),
            ("error_description", denied.description().as_str()),
        ])
    }
}

/// An approved request; only [`GrantCoordinator::issue`] can act on it
#[derive(Debug)]
pub struct ApprovedAuthorization {
    pending: PendingAuthorization,
}

/// Tokens produced by a grant
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: AccessToken,
    pub refresh_token: Option<RefreshToken>,
}

impl TokenGrant {
    pub fn expires_in(&self) -> i64 {
        self.access_token.expires_in(Utc::now())
    }

    pub fn scopes(&self) -> &ScopeSet {
        &self.access_token.scopes
    }
}

pub struct GrantCoordinator {
    registry: Arc<ClientRegistry>,
    tokens: Arc<TokenStore>,
    revocation: Arc<RevocationService>,
    oracle: Arc<dyn PermissionOracle>,
    policy: Arc<ScopePolicy>,
    users: Arc<dyn UserDirectory>,
    allow_implicit_grant: bool,
}

impl GrantCoordinator {
    pub fn new(
        registry: Arc<ClientRegistry>,
        tokens: Arc<TokenStore>,
        revocation: Arc<RevocationService>,
        oracle: Arc<dyn PermissionOracle>,
        policy: Arc<ScopePolicy>,
        users: Arc<dyn UserDirectory>,
        allow_implicit_grant: bool,
    ) -> Self {
        Self {
            registry,
            tokens,
            revocation,
            oracle,
            policy,
            users,
            allow_implicit_grant,
        }
    }

    /// Scopes a role may ever receive
    pub fn user_scopes(&self, permissions: &PermissionSet) -> ScopeSet {
        self.policy.permitted_scopes(permissions)
    }

    /// Verify an authorization request on behalf of `user`
    pub async fn validate_authorization(
        &self,
        request: &AuthorizationRequest,
        user: &Actor,
    ) -> Result<PendingAuthorization, AuthorizeError> {
        let client = match self.registry.get(&request.client_id).await {
            Ok(client) => client,
            Err(AuthError::NotFound(_)) => {
                debug!(client_id = %request.client_id, "Authorization for unknown client");
                return Err(AuthorizeError::direct(AuthError::invalid_client("Unknown client")));
            }
            Err(e) => return Err(AuthorizeError::direct(e)),
        };

        let Some(redirect_uri) = non_empty(request.redirect_uri.as_deref()) else {
            return Err(AuthorizeError::direct(AuthError::invalid_request(
                "redirect_uri is required",
            )));
        };
        if !client.has_redirect_uri(redirect_uri) {
            debug!(client_id = %client.id, "redirect_uri does not match registration");
            return Err(AuthorizeError::direct(AuthError::invalid_request(
                "redirect_uri does not match a registered URI",
            )));
        }

        // From here on errors travel back to the client by redirect
        let mut target = RedirectTarget {
            redirect_uri: redirect_uri.to_string(),
            state: request.state.clone(),
            in_fragment: false,
        };

        let response_type = match request.response_type.as_str() {
            "code" => ResponseType::Code,
            "token" if self.allow_implicit_grant => ResponseType::Token,
            other => {
                return Err(AuthorizeError::redirected(
                    AuthError::UnsupportedResponseType(format!(
                        "response_type '{other}' is not supported"
                    )),
                    &target,
                ));
            }
        };
        target.in_fragment = response_type == ResponseType::Token;
        let fail = |error: AuthError| AuthorizeError::redirected(error, &target);

        let requested = ScopeSet::parse_optional(request.scope.as_deref())
            .map_err(|e| fail(e.into()))?;
        if !requested.is_subset_of(&client.scopes) {
            return Err(fail(AuthError::invalid_scope(
                "Requested scope exceeds the client's registered scopes",
            )));
        }

        let permissions = self.oracle.permissions_for_role(&user.role);
        let user_allowed = self.user_scopes(&permissions);
        let available = self.registry.available_scopes(&client, &permissions);

        let scopes = if requested.is_empty() {
            available
        } else {
            match response_type {
                // Silent narrowing
                ResponseType::Code => {
                    ScopeSet::intersect_all(&requested, &client.scopes, &user_allowed)
                }
                ResponseType::Token => {
                    if !requested.is_subset_of(&available) {
                        return Err(fail(AuthError::invalid_scope(
                            "Requested scope exceeds the user's permissions",
                        )));
                    }
                    requested
                }
            }
        };
        if scopes.is_empty() {
            return Err(fail(AuthError::invalid_scope("No grantable scope for this user")));
        }

        let pkce = match (
            non_empty(request.code_challenge.as_deref()),
            non_empty(request.code_challenge_method.as_deref()),
        ) {
            (None, None) => None,
            (None, Some(_)) => {
                return Err(fail(AuthError::invalid_request(
                    "code_challenge_method sent without code_challenge",
                )));
            }
            (Some(challenge), method) => {
                let method = match method {
                    Some(method) => method
                        .parse::<PkceMethod>()
                        .map_err(|e| fail(AuthError::InvalidRequest(e)))?,
                    None => PkceMethod::default(),
                };
                if !validate_code_challenge(challenge, method) {
                    return Err(fail(AuthError::invalid_request("Malformed code_challenge")));
                }
                Some(PkceChallenge::new(challenge, method))
            }
        };

        match response_type {
            ResponseType::Code if client.is_public() && pkce.is_none() => {
                return Err(fail(AuthError::invalid_request(
                    "Public clients must use PKCE",
                )));
            }
            ResponseType::Token if pkce.is_some() => {
                return Err(fail(AuthError::invalid_request(
                    "PKCE does not apply to the implicit grant",
                )));
            }
            _ => {}
        }

        debug!(
            client_id = %client.id,
            user_id = %user.user_id,
            scope = %scopes,
            "Authorization request verified"
        );
        Ok(PendingAuthorization {
            client,
            user: user.clone(),
            response_type,
            scopes,
            pkce,
            target,
        })
    }

    /// Mint what an approved request asked for and build the client redirect
    pub async fn issue(&self, approved: ApprovedAuthorization) -> Result<Url, AuthError> {
        let pending = approved.pending;

        match pending.response_type {
            ResponseType::Code => {
                let code = self
                    .tokens
                    .create_code(NewCode {
                        client_id: pending.client.id.clone(),
                        user_id: pending.user.user_id,
                        scopes: pending.scopes,
                        redirect_uri: pending.target.redirect_uri.clone(),
                        pkce: pending.pkce,
                    })
                    .await?;
                info!(
                    client_id = %pending.client.id,
                    user_id = %pending.user.user_id,
                    grant_type = "authorization_code",
                    "Authorization code issued"
                );
                pending.target.build(&[("code", code.code.as_str())])
            }
            ResponseType::Token => {
                let token = self
                    .tokens
                    .create_access_token(
                        &pending.client.id,
                        Some(pending.user.user_id),
                        pending.scopes,
                        None,
                    )
                    .await?;
                info!(
                    client_id = %pending.client.id,
                    user_id = %pending.user.user_id,
                    grant_type = "implicit",
                    "Access token issued"
                );
                let expires_in = token.expires_in(Utc::now()).to_string();
                let scope = token.scopes.to_string();
                pending.target.build(&[
                    ("access_token", token.token.as_str()),
                    ("token_type", "Bearer"),
                    ("expires_in", expires_in.as_str()),
                    ("scope", scope.as_str()),
                ])
            }
        }
    }

    /// Apply the resource owner's decision
    pub async fn decide(&self, pending: PendingAuthorization, approved: bool) -> Result<Url, AuthError> {
        if approved {
            self.issue(pending.approve()).await
        } else {
            pending.deny()
        }
    }

    /// `grant_type=authorization_code`
    pub async fn exchange_code(
        &self,
        client: &Client,
        code: &str,
        redirect_uri: Option<&str>,
        code_verifier: Option<&str>,
    ) -> Result<TokenGrant, AuthError> {
        let Some(record) = self.tokens.lookup_code(code).await? else {
            debug!(client_id = %client.id, code = %fingerprint(code), "Unknown or expired code");
            return Err(AuthError::invalid_grant("Invalid or expired authorization code"));
        };

        if record.client_id != client.id {
            warn!(client_id = %client.id, code = %fingerprint(code), "Code presented by another client");
            return Err(AuthError::invalid_grant("Authorization code was issued to another client"));
        }
        if record.consumed {
            return Err(self
                .replay_detected(record.family_id, &client.id, "authorization_code")
                .await);
        }
        if redirect_uri != Some(record.redirect_uri.as_str()) {
            return Err(AuthError::invalid_grant("redirect_uri does not match"));
        }
        match (&record.pkce, code_verifier) {
            (Some(challenge), Some(verifier)) if challenge.verify(verifier) => {}
            (Some(_), Some(_)) => {
                debug!(client_id = %client.id, "PKCE verification failed");
                return Err(AuthError::invalid_grant("PKCE verification failed"));
            }
            (Some(_), None) => return Err(AuthError::invalid_grant("code_verifier is required")),
            (None, Some(_)) => {
                return Err(AuthError::invalid_grant(
                    "code_verifier sent for a code issued without PKCE",
                ));
            }
            (None, None) => {}
        }

        let record = match self.tokens.consume_code(code).await? {
            ConsumeOutcome::Consumed(record) => record,
            ConsumeOutcome::AlreadyConsumed(record) => {
                return Err(self
                    .replay_detected(record.family_id, &client.id, "authorization_code")
                    .await);
            }
            ConsumeOutcome::Missing => {
                return Err(AuthError::invalid_grant("Invalid or expired authorization code"));
            }
        };

        let access_token = self
            .tokens
            .create_access_token(
                &client.id,
                Some(record.user_id),
                record.scopes.clone(),
                Some(record.family_id),
            )
            .await?;
        let refresh_token = self
            .tokens
            .create_refresh_token(&client.id, record.user_id, record.scopes, record.family_id)
            .await?;

        info!(
            client_id = %client.id,
            user_id = %record.user_id,
            family_id = %record.family_id,
            grant_type = "authorization_code",
            "Tokens issued"
        );
        Ok(TokenGrant {
            access_token,
            refresh_token: Some(refresh_token),
        })
    }

    /// `grant_type=refresh_token` with rotation
    pub async fn refresh(
        &self,
        client: &Client,
        refresh_token: &str,
        scope: Option<&str>,
    ) -> Result<TokenGrant, AuthError> {
        let requested = ScopeSet::parse_optional(scope)?;

        let Some(record) = self.tokens.lookup_refresh_token(refresh_token).await? else {
            debug!(client_id = %client.id, token = %fingerprint(refresh_token), "Unknown or expired refresh token");
            return Err(AuthError::invalid_grant("Invalid or expired refresh token"));
        };
        if record.client_id != client.id {
            warn!(client_id = %client.id, token = %fingerprint(refresh_token), "Refresh token presented by another client");
            return Err(AuthError::invalid_grant("Refresh token was issued to another client"));
        }
        if record.consumed {
            return Err(self
                .replay_detected(record.family_id, &client.id, "refresh_token")
                .await);
        }

        let scopes = if requested.is_empty() {
            record.scopes.clone()
        } else if requested.is_subset_of(&record.scopes) {
            requested
        } else {
            return Err(AuthError::invalid_scope(
                "Requested scope exceeds the original grant",
            ));
        };

        let record = match self.tokens.consume_refresh_token(refresh_token).await? {
            ConsumeOutcome::Consumed(record) => record,
            ConsumeOutcome::AlreadyConsumed(record) => {
                return Err(self
                    .replay_detected(record.family_id, &client.id, "refresh_token")
                    .await);
            }
            ConsumeOutcome::Missing => {
                return Err(AuthError::invalid_grant("Invalid or expired refresh token"));
            }
        };

        let access_token = self
            .tokens
            .create_access_token(&client.id, Some(record.user_id), scopes, Some(record.family_id))
            .await?;
        // The rotated refresh token keeps the original grant's scope (RFC 6749 §6)
        let refresh_token = self
            .tokens
            .create_refresh_token(&client.id, record.user_id, record.scopes, record.family_id)
            .await?;

        info!(
            client_id = %client.id,
            user_id = %record.user_id,
            family_id = %record.family_id,
            grant_type = "refresh_token",
            "Tokens rotated"
        );
        Ok(TokenGrant {
            access_token,
            refresh_token: Some(refresh_token),
        })
    }

    /// `grant_type=client_credentials`: the owner's role is the scope ceiling
    pub async fn client_credentials(
        &self,
        client: &Client,
        scope: Option<&str>,
    ) -> Result<TokenGrant, AuthError> {
        if client.is_public() {
            return Err(AuthError::UnauthorizedClient(
                "client_credentials requires a confidential client".to_string(),
            ));
        }

        let requested = ScopeSet::parse_optional(scope)?;
        if !requested.is_subset_of(&client.scopes) {
            return Err(AuthError::invalid_scope(
                "Requested scope exceeds the client's registered scopes",
            ));
        }

        let ceiling = match self.users.role_of(client.owner_id).await? {
            Some(role) => {
                let permissions = self.oracle.permissions_for_role(&role);
                self.registry.available_scopes(client, &permissions)
            }
            None => {
                warn!(client_id = %client.id, owner_id = %client.owner_id, "Client owner not found");
                ScopeSet::new()
            }
        };

        let scopes = if requested.is_empty() {
            ceiling
        } else {
            requested.intersect(&ceiling)
        };
        if scopes.is_empty() {
            return Err(AuthError::invalid_scope("No grantable scope for this client"));
        }

        let access_token = self
            .tokens
            .create_access_token(&client.id, None, scopes, None)
            .await?;
        info!(
            client_id = %client.id,
            grant_type = "client_credentials",
            "Access token issued"
        );
        Ok(TokenGrant {
            access_token,
            refresh_token: None,
        })
    }

    async fn replay_detected(&self, family_id: FamilyId, client_id: &str, grant_type: &str) -> AuthError {
        warn!(
            client_id = %client_id,
            family_id = %family_id,
            grant_type = %grant_type,
            "Credential replay detected; revoking token family"
        );
        match self.revocation.revoke_family(family_id).await {
            Ok(_) => AuthError::invalid_grant("Credential has already been used"),
            Err(e) => e,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
