use bcrypt::{hash, verify};
use log::error;

use super::AuthError;

pub fn hash_password(raw: &str, cost: u32) -> Result<String, AuthError> {
    Ok(hash(raw, cost)?)
}

/// False on mismatch and on a malformed stored hash.
pub fn verify_password(raw: &str, hashed: &str) -> bool {
    match verify(raw, hashed) {
        Ok(valid) => valid,
        Err(e) => {
            error!("Error when checking password hash: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_only_the_original_password() {
        let hashed = hash_password("correct horse", 4).unwrap();
        assert!(verify_password("correct horse", &hashed));
        assert!(!verify_password("wrong horse", &hashed));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }
}
