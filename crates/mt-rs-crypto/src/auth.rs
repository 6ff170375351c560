//! Stored password formats.
//!
//! An SRP record is stored as `#1#<base64 salt>#<base64 verifier>`. Accounts that
//! predate SRP store a bare base64 password hash instead; such a hash is fed to
//! SRP as the password itself, with a fresh salt per login.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;

use crate::srp::create_salted_verification_key;
use crate::CryptoError;

/// Accepts input with or without padding, but only canonical encodings.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// What the auth store holds for an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredPassword {
    /// `#1#salt#verifier`.
    Srp,
    /// Bare base64 hash from before SRP.
    Legacy,
}

impl StoredPassword {
    /// Classify a stored password field.
    pub fn classify(encoded: &str) -> Result<Self, CryptoError> {
        let parts: Vec<&str> = encoded.split('#').collect();
        if parts.len() == 4 {
            if parts[1] == "1" {
                Ok(StoredPassword::Srp)
            } else {
                Err(CryptoError::MalformedVerifier(format!(
                    "unknown mechanism code '{}'",
                    parts[1]
                )))
            }
        } else if base64_is_valid(encoded) {
            Ok(StoredPassword::Legacy)
        } else {
            Err(CryptoError::MalformedVerifier("invalid base64".into()))
        }
    }
}

/// Whether `s` is a canonical base64 string (padding optional).
pub fn base64_is_valid(s: &str) -> bool {
    LENIENT.decode(s).is_ok()
}

/// `#1#<salt>#<verifier>`
pub fn encode_srp_verifier(verifier: &[u8], salt: &[u8]) -> String {
    format!("#1#{}#{}", STANDARD.encode(salt), STANDARD.encode(verifier))
}

/// Split an encoded SRP record into `(verifier, salt)`.
pub fn decode_srp_verifier_and_salt(encoded: &str) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
    let parts: Vec<&str> = encoded.split('#').collect();
    if parts.len() != 4 || !parts[0].is_empty() || parts[1] != "1" {
        return Err(CryptoError::MalformedVerifier(encoded.chars().take(8).collect()));
    }
    let salt = LENIENT
        .decode(parts[2])
        .map_err(|e| CryptoError::Base64(e.to_string()))?;
    let verifier = LENIENT
        .decode(parts[3])
        .map_err(|e| CryptoError::Base64(e.to_string()))?;
    Ok((verifier, salt))
}

/// Fresh `(verifier, salt)` for `password`. The verifier is keyed on the lowercase name.
pub fn generate_srp_verifier_and_salt(name: &str, password: &str) -> (Vec<u8>, Vec<u8>) {
    let (salt, verifier) =
        create_salted_verification_key(&name.to_lowercase(), password.as_bytes(), None);
    (verifier, salt)
}

/// Encoded SRP record for `password`, ready for the auth store.
pub fn get_encoded_srp_verifier(name: &str, password: &str) -> String {
    let (verifier, salt) = generate_srp_verifier_and_salt(name, password);
    encode_srp_verifier(&verifier, &salt)
}
