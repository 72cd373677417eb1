use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pvz_core::{DomainError, ProductId, ReceptionId};

/// Product category.
///
/// Wire names follow the intake terminal vocabulary; English spellings are
/// accepted on input.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductType {
    #[serde(rename = "электроника", alias = "electronics")]
    Electronics,
    #[serde(rename = "одежда", alias = "clothing")]
    Clothing,
    #[serde(rename = "обувь", alias = "shoes")]
    Shoes,
}

impl ProductType {
    pub const ALL: [ProductType; 3] = [
        ProductType::Electronics,
        ProductType::Clothing,
        ProductType::Shoes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Electronics => "электроника",
            ProductType::Clothing => "одежда",
            ProductType::Shoes => "обувь",
        }
    }
}

impl core::fmt::Display for ProductType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "электроника" | "electronics" => Ok(ProductType::Electronics),
            "одежда" | "clothing" => Ok(ProductType::Clothing),
            "обувь" | "shoes" => Ok(ProductType::Shoes),
            other => Err(DomainError::validation(format!(
                "unknown product type '{other}'"
            ))),
        }
    }
}

/// One item registered during a reception.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub reception_id: ReceptionId,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub added_at: DateTime<Utc>,
}

impl Product {
    pub fn new(reception_id: ReceptionId, product_type: ProductType, added_at: DateTime<Utc>) -> Self {
        Self {
            id: ProductId::new(),
            reception_id,
            product_type,
            added_at,
        }
    }
}
