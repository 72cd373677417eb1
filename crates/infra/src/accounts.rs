//! Account registration and password login.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use pvz_auth::{Hs256Jwt, PasswordHasher, Role, User, normalize_email, validate_password};
use pvz_core::DomainError;

use crate::deadline::Deadline;
use crate::engine::log_failure;
use crate::error::ServiceError;
use crate::store::{EntityStore, StoreError};

/// Creates accounts and exchanges credentials for access tokens.
#[derive(Debug, Clone)]
pub struct AccountService<S> {
    store: S,
    jwt: Arc<Hs256Jwt>,
    hasher: PasswordHasher,
}

impl<S> AccountService<S>
where
    S: EntityStore,
{
    pub fn new(store: S, jwt: Arc<Hs256Jwt>, hasher: PasswordHasher) -> Self {
        Self { store, jwt, hasher }
    }

    /// Create an account. The email is normalized (trimmed, lowercased) and
    /// must not already be registered.
    #[instrument(skip(self, email, password, deadline), fields(role = %role))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        role: Role,
        deadline: Deadline,
    ) -> Result<User, ServiceError> {
        const OP: &str = "register";

        let result = deadline
            .run(OP, async {
                let email = normalize_email(email)?;
                validate_password(password)?;

                let password_hash = self.hash(OP, password).await?;
                match self.store.insert_user(&email, &password_hash, role).await {
                    Ok(user) => Ok(user),
                    Err(StoreError::Conflict(_)) => Err(DomainError::EmailTaken { email }.into()),
                    Err(e) => Err(ServiceError::store(OP)(e)),
                }
            })
            .await;

        if let Ok(user) = &result {
            info!(user_id = %user.id, "user registered");
        }
        log_failure(OP, &result);
        result
    }

    /// Verify credentials and issue a token for the account's role.
    ///
    /// Unknown email and wrong password fail identically.
    #[instrument(skip(self, email, password, deadline))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        deadline: Deadline,
    ) -> Result<String, ServiceError> {
        const OP: &str = "login";

        let result = deadline
            .run(OP, async {
                let Ok(email) = normalize_email(email) else {
                    return Err(DomainError::InvalidCredentials.into());
                };
                let user = self
                    .store
                    .find_user_by_email(&email)
                    .await
                    .map_err(ServiceError::store(OP))?
                    .ok_or(DomainError::InvalidCredentials)?;

                if !self.verify(OP, password, &user.password_hash).await? {
                    return Err(DomainError::InvalidCredentials.into());
                }

                let token = self
                    .jwt
                    .issue(user.id, user.role, Utc::now())
                    .map_err(|e| ServiceError::credentials(OP)(e.to_string()))?;
                info!(user_id = %user.id, role = %user.role, "user logged in");
                Ok(token)
            })
            .await;

        log_failure(OP, &result);
        result
    }

    // bcrypt is CPU-bound; keep it off the async workers.
    async fn hash(&self, operation: &'static str, password: &str) -> Result<String, ServiceError> {
        let hasher = self.hasher;
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| ServiceError::credentials(operation)(e.to_string()))?
            .map_err(|e| ServiceError::credentials(operation)(e.to_string()))
    }

    async fn verify(
        &self,
        operation: &'static str,
        password: &str,
        hash: &str,
    ) -> Result<bool, ServiceError> {
        let hasher = self.hasher;
        let password = password.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| ServiceError::credentials(operation)(e.to_string()))?
            .map_err(|e| ServiceError::credentials(operation)(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pvz_auth::JwtValidator;

    use crate::store::InMemoryEntityStore;

    const SECRET: &[u8] = b"accounts-test-secret";

    fn service() -> (AccountService<InMemoryEntityStore>, Arc<Hs256Jwt>) {
        let jwt = Arc::new(Hs256Jwt::new(SECRET, chrono::Duration::seconds(60)));
        let accounts = AccountService::new(
            InMemoryEntityStore::new(),
            jwt.clone(),
            PasswordHasher::new(4),
        );
        (accounts, jwt)
    }

    #[tokio::test]
    async fn registered_user_logs_in_with_their_role() {
        let (accounts, jwt) = service();
        let user = accounts
            .register(" Olga@Example.com ", "correct horse", Role::Moderator, Deadline::none())
            .await
            .unwrap();
        assert_eq!(user.email, "olga@example.com");
        assert_ne!(user.password_hash, "correct horse");

        let token = accounts
            .login("OLGA@example.com", "correct horse", Deadline::none())
            .await
            .unwrap();
        let claims = jwt.validate(&token, Utc::now()).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::Moderator);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let (accounts, _) = service();
        accounts
            .register("ivan@example.com", "pw-one", Role::Employee, Deadline::none())
            .await
            .unwrap();

        let err = accounts
            .register("IVAN@example.com", "pw-two", Role::Moderator, Deadline::none())
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(DomainError::EmailTaken { email }) if email == "ivan@example.com"
        ));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_fail_the_same_way() {
        let (accounts, _) = service();
        accounts
            .register("petr@example.com", "right", Role::Employee, Deadline::none())
            .await
            .unwrap();

        for (email, password) in [
            ("petr@example.com", "wrong"),
            ("nobody@example.com", "right"),
            ("not-an-email", "right"),
        ] {
            let err = accounts.login(email, password, Deadline::none()).await.unwrap_err();
            assert_eq!(err.as_domain(), Some(&DomainError::InvalidCredentials), "{email}");
        }
    }

    #[tokio::test]
    async fn invalid_registration_input_is_a_validation_error() {
        let (accounts, _) = service();
        for (email, password) in [
            ("no-at-sign", "pw"),
            ("anna@example.com", ""),
            ("anna@example.com", &"x".repeat(72)[..]),
        ] {
            let err = accounts
                .register(email, password, Role::Employee, Deadline::none())
                .await
                .unwrap_err();
            assert!(matches!(err.as_domain(), Some(DomainError::Validation(_))), "{email}");
        }
    }
}
