// Password check for the configured administrator.

use bcrypt::verify;

use crate::error::AuthError;

fn is_bcrypt_hash(stored: &str) -> bool {
    ["$2a$", "$2b$", "$2x$", "$2y$"]
        .iter()
        .any(|prefix| stored.starts_with(prefix))
}

/// Compare a submitted password against the stored one, hashed or plain.
pub fn verify_password(supplied: &str, stored: &str) -> Result<bool, AuthError> {
    if is_bcrypt_hash(stored) {
        verify(supplied, stored).map_err(|e| AuthError::NotConfigured(e.to_string()))
    } else {
        Ok(constant_time_eq(supplied.as_bytes(), stored.as_bytes()))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
