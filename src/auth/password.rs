//! Password hashing

use bcrypt::{hash, verify, BcryptError, DEFAULT_COST};

pub fn hash_password(plain: &str) -> Result<String, BcryptError> {
    hash(plain, DEFAULT_COST)
}

/// A malformed stored hash never verifies
pub fn verify_password(plain: &str, hashed: &str) -> bool {
    verify(plain, hashed).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hashed = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hashed));
        assert!(!verify_password("hunter23", &hashed));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same-input").unwrap();
        let b = hash_password("same-input").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("same-input", &a));
        assert!(verify_password("same-input", &b));
    }

    #[test]
    fn test_malformed_hash() {
        assert!(!verify_password("anything", "not-a-bcrypt-hash"));
    }
}
