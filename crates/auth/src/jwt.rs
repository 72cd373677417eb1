//! HS256 token issuing and verification.
//!
//! The secret is handed in at construction; nothing here reads the
//! environment.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use pvz_core::UserId;

use crate::{JwtClaims, Role, TokenValidationError, validate_claims};

/// Verifies bearer tokens.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenIssueError {
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// HMAC-SHA256 signer/verifier over [`JwtClaims`].
#[derive(Clone)]
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl core::fmt::Debug for Hs256Jwt {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256Jwt")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl Hs256Jwt {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        // Expiry lives in `JwtClaims` and is checked by `validate_claims`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Sign a token for `sub` acting as `role`, valid from `now` for the TTL.
    pub fn issue(&self, sub: UserId, role: Role, now: DateTime<Utc>) -> Result<String, TokenIssueError> {
        let claims = JwtClaims {
            sub,
            role,
            issued_at: now,
            expires_at: now + self.ttl,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenIssueError::Signing(e.to_string()))
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(secret: &str) -> Hs256Jwt {
        Hs256Jwt::new(secret.as_bytes(), Duration::hours(1))
    }

    #[test]
    fn issued_token_validates_with_same_secret() {
        let signer = jwt("secret");
        let now = Utc::now();
        let sub = UserId::new();
        let token = signer.issue(sub, Role::Moderator, now).unwrap();

        let claims = signer.validate(&token, now).unwrap();
        assert_eq!(claims.sub, sub);
        assert_eq!(claims.role, Role::Moderator);
        assert_eq!(claims.expires_at, now + Duration::hours(1));
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let now = Utc::now();
        let token = jwt("one").issue(UserId::new(), Role::Employee, now).unwrap();
        assert!(matches!(
            jwt("two").validate(&token, now),
            Err(TokenValidationError::Malformed(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let signer = jwt("secret");
        let now = Utc::now();
        let token = signer.issue(UserId::new(), Role::Employee, now).unwrap();
        assert_eq!(
            signer.validate(&token, now + Duration::hours(2)),
            Err(TokenValidationError::Expired)
        );
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            jwt("secret").validate("not.a.token", Utc::now()),
            Err(TokenValidationError::Malformed(_))
        ));
    }
}
