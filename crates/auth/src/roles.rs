use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::permissions::{self, Permission};

/// Caller role carried in the token.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Works the intake desk: opens/closes receptions, scans products.
    Employee,
    /// Manages the PVZ network.
    Moderator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Moderator => "moderator",
        }
    }

    /// Permissions granted by this role.
    pub fn permissions(&self) -> Vec<Permission> {
        match self {
            Role::Employee => vec![
                permissions::PVZ_READ,
                permissions::RECEPTIONS_OPEN,
                permissions::RECEPTIONS_CLOSE,
                permissions::PRODUCTS_ADD,
                permissions::PRODUCTS_RETRACT,
            ],
            Role::Moderator => vec![permissions::PVZ_CREATE, permissions::PVZ_READ],
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "employee" => Ok(Role::Employee),
            "moderator" => Ok(Role::Moderator),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn employees_cannot_register_pvzs() {
        assert!(!Role::Employee.permissions().contains(&permissions::PVZ_CREATE));
        assert!(Role::Moderator.permissions().contains(&permissions::PVZ_CREATE));
    }

    #[test]
    fn moderators_cannot_touch_receptions() {
        let perms = Role::Moderator.permissions();
        assert!(!perms.contains(&permissions::RECEPTIONS_OPEN));
        assert!(!perms.contains(&permissions::PRODUCTS_ADD));
    }

    #[test]
    fn role_names_round_trip() {
        for role in [Role::Employee, Role::Moderator] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
        }
        assert!("admin".parse::<Role>().is_err());
    }
}
