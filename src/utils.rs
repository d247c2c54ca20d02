use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

use crate::error::AuthError;

/// Number of random bytes behind a PKCE code verifier.
pub const CODE_VERIFIER_BYTES: usize = 64;

/// Generates a PKCE code verifier from 64 bytes of OS entropy, encoded as
/// base64url without padding (86 characters).
///
/// Fails with [`AuthError::AuthStart`] when the OS entropy source is
/// unavailable. No weaker fallback is attempted.
pub fn generate_code_verifier() -> Result<String, AuthError> {
    let mut bytes = [0u8; CODE_VERIFIER_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AuthError::AuthStart(format!("entropy source unavailable: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}
