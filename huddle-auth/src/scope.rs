//! OAuth scopes and ordered scope sets
//!
//! Scopes form a fixed enumeration. A [`ScopeSet`] keeps the order in which scopes
//! were first listed and collapses duplicates, so intersections are stable with
//! respect to the requested ordering.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scope parsing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("Unknown scope: {0}")]
    Unknown(String),
}

/// A named capability a client may be granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    #[serde(rename = "openid")]
    OpenId,
    #[serde(rename = "profile")]
    Profile,
    #[serde(rename = "read")]
    Read,
    #[serde(rename = "private_read")]
    PrivateRead,
    #[serde(rename = "write")]
    Write,
    #[serde(rename = "manage_bot")]
    ManageBot,
}

impl Scope {
    /// Every scope, in canonical order
    pub const ALL: [Scope; 6] = [
        Scope::OpenId,
        Scope::Profile,
        Scope::Read,
        Scope::PrivateRead,
        Scope::Write,
        Scope::ManageBot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::OpenId => "openid",
            Scope::Profile => "profile",
            Scope::Read => "read",
            Scope::PrivateRead => "private_read",
            Scope::Write => "write",
            Scope::ManageBot => "manage_bot",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scope::ALL
            .iter()
            .copied()
            .find(|scope| scope.as_str() == s)
            .ok_or_else(|| ScopeError::Unknown(s.to_string()))
    }
}

/// Ordered, duplicate-free set of scopes
///
/// Serialized as a JSON array; [`fmt::Display`] renders the space-delimited
/// encoding used on the OAuth wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Scope>", into = "Vec<Scope>")]
pub struct ScopeSet(Vec<Scope>);

impl ScopeSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Parse the space-delimited wire encoding; unknown names are rejected
    pub fn parse(input: &str) -> Result<Self, ScopeError> {
        input
            .split_whitespace()
            .map(Scope::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map(Self::from)
    }

    /// Parse an optional `scope` parameter; absent means empty
    pub fn parse_optional(input: Option<&str>) -> Result<Self, ScopeError> {
        input.map(Self::parse).transpose().map(Option::unwrap_or_default)
    }

    pub fn contains(&self, scope: Scope) -> bool {
        self.0.contains(&scope)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Scope> + '_ {
        self.0.iter().copied()
    }

    pub fn is_subset_of(&self, other: &ScopeSet) -> bool {
        self.iter().all(|scope| other.contains(scope))
    }

    /// Scopes present in both sets, in `self`'s order
    pub fn intersect(&self, other: &ScopeSet) -> ScopeSet {
        Self(self.iter().filter(|scope| other.contains(*scope)).collect())
    }

    /// Resolve a request against the client's registered scopes and the user's
    /// permitted scopes, preserving the order of `requested`
    pub fn intersect_all(
        requested: &ScopeSet,
        client_allowed: &ScopeSet,
        user_allowed: &ScopeSet,
    ) -> ScopeSet {
        requested.intersect(client_allowed).intersect(user_allowed)
    }

    /// Names of the contained scopes
    pub fn to_names(&self) -> Vec<String> {
        self.iter().map(|scope| scope.as_str().to_string()).collect()
    }
}

impl From<Vec<Scope>> for ScopeSet {
    fn from(scopes: Vec<Scope>) -> Self {
        scopes.into_iter().collect()
    }
}

impl From<ScopeSet> for Vec<Scope> {
    fn from(set: ScopeSet) -> Self {
        set.0
    }
}

impl FromIterator<Scope> for ScopeSet {
    fn from_iter<I: IntoIterator<Item = Scope>>(iter: I) -> Self {
        let mut scopes = Vec::new();
        for scope in iter {
            if !scopes.contains(&scope) {
                scopes.push(scope);
            }
        }
        Self(scopes)
    }
}

impl FromStr for ScopeSet {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for scope in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(scope.as_str())?;
            first = false;
        }
        Ok(())
    }
}
