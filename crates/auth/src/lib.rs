//! `pvz-auth`: access/identity boundary: roles, permissions, tokens.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod roles;
pub mod user;

pub use authorize::{AuthzError, Principal, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256Jwt, JwtValidator, TokenIssueError};
pub use password::{MAX_PASSWORD_BYTES, PasswordError, PasswordHasher, validate_password};
pub use permissions::Permission;
pub use roles::{Role, UnknownRole};
pub use user::{User, normalize_email};
