//! PKCE (Proof Key for Code Exchange)
//!
//! RFC 7636. Both `plain` and `S256` challenge methods are accepted; `plain`
//! is the default when a challenge arrives without a method.

use crate::crypto::constant_time_eq;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Code challenge transformation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PkceMethod {
    #[default]
    #[serde(rename = "plain")]
    Plain,
    #[serde(rename = "S256")]
    S256,
}

impl PkceMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PkceMethod::Plain => "plain",
            PkceMethod::S256 => "S256",
        }
    }
}

impl fmt::Display for PkceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PkceMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(PkceMethod::Plain),
            "S256" => Ok(PkceMethod::S256),
            other => Err(format!("Unsupported code_challenge_method: {other}")),
        }
    }
}

/// Challenge recorded with an authorization code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkceChallenge {
    pub challenge: String,
    pub method: PkceMethod,
}

impl PkceChallenge {
    pub fn new(challenge: impl Into<String>, method: PkceMethod) -> Self {
        Self {
            challenge: challenge.into(),
            method,
        }
    }

    /// Check a verifier presented at the token endpoint
    pub fn verify(&self, code_verifier: &str) -> bool {
        verify_pkce(code_verifier, &self.challenge, self.method)
    }
}

/// `BASE64URL(SHA256(ASCII(code_verifier)))`
pub fn s256_challenge(code_verifier: &str) -> String {
    let hash = Sha256::digest(code_verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Verify a code_verifier against the stored challenge
pub fn verify_pkce(code_verifier: &str, code_challenge: &str, method: PkceMethod) -> bool {
    if !validate_code_verifier(code_verifier) {
        return false;
    }

    let computed = match method {
        PkceMethod::Plain => code_verifier.to_string(),
        PkceMethod::S256 => s256_challenge(code_verifier),
    };
    constant_time_eq(computed.as_bytes(), code_challenge.as_bytes())
}

/// RFC 7636 §4.1: 43-128 characters of `[A-Za-z0-9-._~]`
pub fn validate_code_verifier(code_verifier: &str) -> bool {
    let len = code_verifier.len();
    if !(43..=128).contains(&len) {
        return false;
    }

    code_verifier
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~'))
}

/// Validate a code_challenge for the given method
///
/// `S256` challenges are exactly 43 base64url characters; `plain` challenges
/// are the verifier itself and follow the verifier grammar.
pub fn validate_code_challenge(code_challenge: &str, method: PkceMethod) -> bool {
    match method {
        PkceMethod::S256 => {
            code_challenge.len() == 43
                && code_challenge
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        }
        PkceMethod::Plain => validate_code_verifier(code_challenge),
    }
}
