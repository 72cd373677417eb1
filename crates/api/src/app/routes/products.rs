use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use pvz_auth::permissions;
use pvz_core::PvzId;
use pvz_receptions::ProductType;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::PrincipalContext;

pub async fn add_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::AddProductRequest>, JsonRejection>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, &permissions::PRODUCTS_ADD) {
        return resp;
    }
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::bad_request(e.body_text()),
    };
    let pvz_id: PvzId = match body.pvz_id.parse() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let product_type: ProductType = match body.product_type.parse() {
        Ok(t) => t,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .engine
        .attach_product(pvz_id, product_type, services.deadline())
        .await
    {
        Ok(product) => (StatusCode::CREATED, Json(dto::ProductDto::from(&product))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_last_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(pvz_id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, &permissions::PRODUCTS_RETRACT) {
        return resp;
    }
    let pvz_id: PvzId = match pvz_id.parse() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .engine
        .retract_last_product(pvz_id, services.deadline())
        .await
    {
        Ok(product) => (StatusCode::OK, Json(dto::ProductDto::from(&product))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
