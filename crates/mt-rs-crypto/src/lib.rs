//! Cryptography: SRP-6a (SHA-256, 2048-bit group) and password verifier encoding.

pub mod auth;
pub mod srp;

pub use auth::{
    base64_is_valid, decode_srp_verifier_and_salt, encode_srp_verifier,
    generate_srp_verifier_and_salt, get_encoded_srp_verifier, StoredPassword,
};
pub use srp::{create_salted_verification_key, SrpUser, SrpVerifier, SESSION_KEY_LEN};

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The client's public value A is a multiple of N.
    #[error("SRP-6a safety check violated")]
    SafetyCheck,

    #[error("SRP value does not fit the group modulus")]
    ValueTooLarge,

    #[error("proof has wrong length: expected {expected}, got {got}")]
    ProofLength { expected: usize, got: usize },

    #[error("base64 decode error: {0}")]
    Base64(String),

    #[error("malformed encoded verifier: {0}")]
    MalformedVerifier(String),
}
