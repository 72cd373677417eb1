use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pvz_core::{DomainError, PvzId};

/// Cities a PVZ may be registered in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum City {
    #[serde(rename = "Москва", alias = "moscow", alias = "Moscow")]
    Moscow,
    #[serde(
        rename = "Санкт-Петербург",
        alias = "saint_petersburg",
        alias = "Saint Petersburg"
    )]
    SaintPetersburg,
    #[serde(rename = "Казань", alias = "kazan", alias = "Kazan")]
    Kazan,
}

impl City {
    pub const ALL: [City; 3] = [City::Moscow, City::SaintPetersburg, City::Kazan];

    pub fn as_str(&self) -> &'static str {
        match self {
            City::Moscow => "Москва",
            City::SaintPetersburg => "Санкт-Петербург",
            City::Kazan => "Казань",
        }
    }
}

impl core::fmt::Display for City {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for City {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Москва" | "moscow" | "Moscow" => Ok(City::Moscow),
            "Санкт-Петербург" | "saint_petersburg" | "Saint Petersburg" => {
                Ok(City::SaintPetersburg)
            }
            "Казань" | "kazan" | "Kazan" => Ok(City::Kazan),
            other => Err(DomainError::validation(format!(
                "city '{other}' is not served"
            ))),
        }
    }
}

/// A pickup point. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pvz {
    pub id: PvzId,
    pub city: City,
    pub registration_date: DateTime<Utc>,
}

impl Pvz {
    pub fn register(city: City, registration_date: DateTime<Utc>) -> Self {
        Self {
            id: PvzId::new(),
            city,
            registration_date,
        }
    }
}
