use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    response::IntoResponse,
};

use pvz_auth::permissions;
use pvz_directory::City;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::PrincipalContext;

pub async fn create_pvz(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::CreatePvzRequest>, JsonRejection>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, &permissions::PVZ_CREATE) {
        return resp;
    }
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::bad_request(e.body_text()),
    };
    let city: City = match body.city.parse() {
        Ok(c) => c,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.directory.create_pvz(city, services.deadline()).await {
        Ok(pvz) => (StatusCode::CREATED, Json(dto::PvzDto::from(&pvz))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_pvzs(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    params: Result<Query<dto::ListPvzParams>, QueryRejection>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, &permissions::PVZ_READ) {
        return resp;
    }
    let Query(params) = match params {
        Ok(p) => p,
        Err(e) => return errors::bad_request(e.body_text()),
    };

    match services
        .directory
        .list_pvzs(
            params.start_date,
            params.end_date,
            params.page,
            params.limit,
            services.deadline(),
        )
        .await
    {
        Ok(overviews) => {
            let body: Vec<dto::PvzOverviewDto> = overviews.iter().map(Into::into).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}
