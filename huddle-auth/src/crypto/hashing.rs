//! Salted secret digests and log fingerprints

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;

/// Salt for secret digests (32 bytes = 256 bits)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salt(pub [u8; 32]);

impl Default for Salt {
    fn default() -> Self {
        Self::new()
    }
}

impl Salt {
    /// Create a new random salt
    pub fn new() -> Self {
        let mut salt = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut salt);
        Salt(salt)
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }
}

impl fmt::Display for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base64())
    }
}

/// Stored form of a client secret: `base64(SHA256(secret + ":" + base64(salt)))`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretDigest {
    hash: String,
    salt: Salt,
}

impl SecretDigest {
    /// Digest `secret` under a fresh salt
    pub fn new(secret: &str) -> Self {
        Self::with_salt(secret, Salt::new())
    }

    pub fn with_salt(secret: &str, salt: Salt) -> Self {
        let hash = hash_secret(secret, &salt);
        Self { hash, salt }
    }

    /// Constant-time check of a presented secret
    pub fn verify(&self, candidate: &str) -> bool {
        let computed = hash_secret(candidate, &self.salt);
        constant_time_eq(computed.as_bytes(), self.hash.as_bytes())
    }
}

impl fmt::Debug for SecretDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretDigest").finish_non_exhaustive()
    }
}

fn hash_secret(secret: &str, salt: &Salt) -> String {
    let salted = format!("{}:{}", secret, salt.to_base64());

    let mut hasher = Sha256::new();
    hasher.update(salted.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Byte comparison whose timing does not depend on where the inputs differ
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Short stable identifier for a credential, safe to put in logs
///
/// First 8 hex characters of the value's SHA-256.
pub fn fingerprint(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    digest[..4].iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salt_base64() {
        let salt = Salt::new();
        // 32 bytes -> 44 padded base64 chars
        assert_eq!(salt.to_base64().len(), 44);
        assert_eq!(salt.to_string(), salt.to_base64());
        assert_ne!(salt, Salt::new());
    }

    #[test]
    fn test_secret_digest_verification() {
        let digest = SecretDigest::new("s3cret-value");
        assert!(digest.verify("s3cret-value"));
        assert!(!digest.verify("s3cret-valuf"));
        assert!(!digest.verify(""));
    }

    #[test]
    fn test_same_secret_different_salt() {
        let a = SecretDigest::new("shared");
        let b = SecretDigest::new("shared");
        assert_ne!(a, b);
        assert!(a.verify("shared") && b.verify("shared"));
    }

    #[test]
    fn test_digest_debug_hides_hash() {
        let digest = SecretDigest::new("shared");
        assert_eq!(format!("{digest:?}"), "SecretDigest { .. }");
    }

    #[test]
    fn test_fingerprint() {
        let fp = fingerprint("some-token");
        assert_eq!(fp.len(), 8);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(fp, fingerprint("some-token"));
        assert_ne!(fp, fingerprint("other-token"));
        // sha256("abc") = ba7816bf...
        assert_eq!(fingerprint("abc"), "ba7816bf");
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
