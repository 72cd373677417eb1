use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use pvz_auth::permissions;
use pvz_core::PvzId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::PrincipalContext;

pub async fn open_reception(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::OpenReceptionRequest>, JsonRejection>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, &permissions::RECEPTIONS_OPEN) {
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

    match services.engine.open_reception(pvz_id, services.deadline()).await {
        Ok(reception) => {
            (StatusCode::CREATED, Json(dto::ReceptionDto::from(&reception))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn close_last_reception(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(pvz_id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, &permissions::RECEPTIONS_CLOSE) {
        return resp;
    }
    let pvz_id: PvzId = match pvz_id.parse() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.engine.close_reception(pvz_id, services.deadline()).await {
        Ok(reception) => (StatusCode::OK, Json(dto::ReceptionDto::from(&reception))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
