use pvz_auth::{Principal, Role};
use pvz_core::UserId;

/// Principal context for a request (authenticated identity + role).
///
/// Inserted by the auth middleware; present on every protected route.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal_id: UserId,
    role: Role,
}

impl PrincipalContext {
    pub fn new(principal_id: UserId, role: Role) -> Self {
        Self { principal_id, role }
    }

    pub fn principal_id(&self) -> UserId {
        self.principal_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn to_principal(&self) -> Principal {
        Principal {
            principal_id: self.principal_id,
            role: self.role,
        }
    }
}
