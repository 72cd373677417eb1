//! Registered accounts.

use serde::Serialize;

use pvz_core::{DomainError, DomainResult, UserId};

use crate::Role;

/// A registered account. The password hash never leaves the store/auth
/// boundary in serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    #[serde(skip)]
    pub password_hash: String,
}

/// Canonical form used for storage and lookup: trimmed, lowercased, with a
/// non-empty local part and domain around a single `@`.
pub fn normalize_email(raw: &str) -> DomainResult<String> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(email)
        }
        _ => Err(DomainError::validation("invalid email format")),
    }
}
