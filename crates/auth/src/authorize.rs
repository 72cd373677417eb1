use thiserror::Error;

use pvz_core::UserId;

use crate::{Permission, Role};

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub principal_id: UserId,
    pub role: Role,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: role '{role}' lacks permission '{permission}'")]
    Forbidden { role: Role, permission: String },
}

/// Check that the principal's role grants `required`.
///
/// - No IO
/// - No panics
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if principal.role.permissions().contains(required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            role: principal.role,
            permission: required.as_str().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions;

    fn principal(role: Role) -> Principal {
        Principal {
            principal_id: UserId::new(),
            role,
        }
    }

    #[test]
    fn employee_may_open_receptions() {
        assert!(authorize(&principal(Role::Employee), &permissions::RECEPTIONS_OPEN).is_ok());
    }

    #[test]
    fn employee_may_not_create_pvz() {
        let err = authorize(&principal(Role::Employee), &permissions::PVZ_CREATE).unwrap_err();
        assert_eq!(
            err,
            AuthzError::Forbidden {
                role: Role::Employee,
                permission: "pvz.create".to_string()
            }
        );
    }

    #[test]
    fn both_roles_may_list() {
        for role in [Role::Employee, Role::Moderator] {
            assert!(authorize(&principal(role), &permissions::PVZ_READ).is_ok());
        }
    }
}
