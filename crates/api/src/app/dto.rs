use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pvz_auth::User;
use pvz_core::{ProductId, PvzId, ReceptionId, UserId};
use pvz_directory::{Pvz, PvzOverview, ReceptionOverview};
use pvz_receptions::{Product, Reception};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct DummyLoginRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePvzRequest {
    pub city: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenReceptionRequest {
    pub pvz_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddProductRequest {
    #[serde(rename = "type")]
    pub product_type: String,
    pub pvz_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPvzParams {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: UserId,
    pub email: String,
    pub role: &'static str,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role.as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PvzDto {
    pub id: PvzId,
    pub registration_date: DateTime<Utc>,
    pub city: &'static str,
}

impl From<&Pvz> for PvzDto {
    fn from(pvz: &Pvz) -> Self {
        Self {
            id: pvz.id,
            registration_date: pvz.registration_date,
            city: pvz.city.as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceptionDto {
    pub id: ReceptionId,
    pub date_time: DateTime<Utc>,
    pub pvz_id: PvzId,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl From<&Reception> for ReceptionDto {
    fn from(r: &Reception) -> Self {
        Self {
            id: r.id,
            date_time: r.opened_at,
            pvz_id: r.pvz_id,
            status: r.status.as_str(),
            closed_at: r.closed_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: ProductId,
    pub date_time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub product_type: &'static str,
    pub reception_id: ReceptionId,
}

impl From<&Product> for ProductDto {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id,
            date_time: p.added_at,
            product_type: p.product_type.as_str(),
            reception_id: p.reception_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReceptionOverviewDto {
    pub reception: ReceptionDto,
    pub products: Vec<ProductDto>,
}

impl From<&ReceptionOverview> for ReceptionOverviewDto {
    fn from(o: &ReceptionOverview) -> Self {
        Self {
            reception: (&o.reception).into(),
            products: o.products.iter().map(ProductDto::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PvzOverviewDto {
    pub pvz: PvzDto,
    pub receptions: Vec<ReceptionOverviewDto>,
}

impl From<&PvzOverview> for PvzOverviewDto {
    fn from(o: &PvzOverview) -> Self {
        Self {
            pvz: (&o.pvz).into(),
            receptions: o.receptions.iter().map(ReceptionOverviewDto::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pvz_directory::City;
    use pvz_receptions::ProductType;

    #[test]
    fn overview_serializes_camel_case_wire_names() {
        let pvz = Pvz::register(City::SaintPetersburg, Utc::now());
        let reception = Reception::open(pvz.id, Utc::now());
        let product = reception
            .register_product(ProductType::Electronics, Utc::now())
            .unwrap();
        let overview = PvzOverview {
            pvz,
            receptions: vec![ReceptionOverview {
                reception,
                products: vec![product],
            }],
        };

        let json = serde_json::to_value(PvzOverviewDto::from(&overview)).unwrap();
        assert_eq!(json["pvz"]["city"], "Санкт-Петербург");
        assert!(json["pvz"]["registrationDate"].is_string());
        let r = &json["receptions"][0];
        assert_eq!(r["reception"]["status"], "in_progress");
        assert!(r["reception"].get("closedAt").is_none());
        assert_eq!(r["products"][0]["type"], "электроника");
        assert_eq!(r["products"][0]["receptionId"], r["reception"]["id"]);
    }
}
