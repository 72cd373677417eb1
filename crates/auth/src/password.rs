//! Password hashing (bcrypt).

use thiserror::Error;

use pvz_core::{DomainError, DomainResult};

/// bcrypt only looks at the first 72 bytes; longer passwords are refused
/// rather than silently truncated.
pub const MAX_PASSWORD_BYTES: usize = 72;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("password hashing failed: {0}")]
pub struct PasswordError(String);

impl From<bcrypt::BcryptError> for PasswordError {
    fn from(err: bcrypt::BcryptError) -> Self {
        Self(err.to_string())
    }
}

pub fn validate_password(password: &str) -> DomainResult<()> {
    if password.is_empty() {
        return Err(DomainError::validation("password must not be empty"));
    }
    if password.len() >= MAX_PASSWORD_BYTES {
        return Err(DomainError::validation(format!(
            "password must be shorter than {MAX_PASSWORD_BYTES} bytes"
        )));
    }
    Ok(())
}

/// bcrypt hasher with a fixed work factor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        Ok(bcrypt::hash(password, self.cost)?)
    }

    /// `Ok(false)` on mismatch; `Err` only for an unreadable hash.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        Ok(bcrypt::verify(password, hash)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(4)
    }

    #[test]
    fn hash_verifies_only_the_original_password() {
        let h = hasher();
        let hash = h.hash("hunter2").unwrap();
        assert_ne!(hash, "hunter2");
        assert!(h.verify("hunter2", &hash).unwrap());
        assert!(!h.verify("hunter3", &hash).unwrap());
    }

    #[test]
    fn same_password_hashes_differently() {
        let h = hasher();
        assert_ne!(h.hash("pw").unwrap(), h.hash("pw").unwrap());
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert!(hasher().verify("pw", "not-a-bcrypt-hash").is_err());
    }

    #[test]
    fn password_length_is_bounded() {
        assert!(validate_password("ok").is_ok());
        assert!(validate_password("").is_err());
        assert!(validate_password(&"x".repeat(MAX_PASSWORD_BYTES - 1)).is_ok());
        assert!(matches!(
            validate_password(&"x".repeat(MAX_PASSWORD_BYTES)),
            Err(DomainError::Validation(_))
        ));
    }
}
