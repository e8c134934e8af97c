//! Cryptographic helpers for credentials
//!
//! Client secrets are stored as salted SHA-256 digests and compared in constant
//! time. Token, code and secret values come from the thread-local CSPRNG.

pub mod hashing;
pub mod keys;

pub use hashing::{Salt, SecretDigest, constant_time_eq, fingerprint};
pub use keys::{generate_client_id, generate_secure_key};
