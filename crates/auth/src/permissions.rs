use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier (e.g. "receptions.open").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

pub const PVZ_CREATE: Permission = Permission::from_static("pvz.create");
pub const PVZ_READ: Permission = Permission::from_static("pvz.read");
pub const RECEPTIONS_OPEN: Permission = Permission::from_static("receptions.open");
pub const RECEPTIONS_CLOSE: Permission = Permission::from_static("receptions.close");
pub const PRODUCTS_ADD: Permission = Permission::from_static("products.add");
pub const PRODUCTS_RETRACT: Permission = Permission::from_static("products.retract");
