use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

pub const MIN_PASSWORD_LEN: usize = 8;

/// SHA-256 hex digest of a password. Only this digest is ever sent to the
/// webhook, never the plaintext.
pub fn password_digest(password: &str) -> String {
    sha256_hex(password)
}

/// Check a new password against its confirmation before anything is sent.
pub fn validate_new_password(password: &str, confirmation: &str) -> Result<(), &'static str> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err("A senha deve ter no mínimo 8 caracteres.");
    }
    if password != confirmation {
        return Err("As senhas não coincidem.");
    }
    Ok(())
}

/// Generate an opaque session token to return to the client.
/// Only hash(token) is kept in the session table.
pub fn generate_access_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash token for session lookup (SHA-256 hex).
pub fn hash_access_token(token: &str) -> String {
    sha256_hex(token)
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
