//! HTTP application wiring.
//!
//! - `services.rs`: store selection and the shared engine/directory
//! - `routes/`: handlers, one file per resource
//! - `dto.rs`: request/response JSON shapes
//! - `errors.rs`: error-to-status mapping

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use pvz_auth::JwtValidator;
use pvz_infra::config::AppConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router, choosing the store from `config`.
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let store = services::build_store(config).await?;
    Ok(build_app_with_store(config, store))
}

/// Build the router over an already constructed store.
pub fn build_app_with_store(config: &AppConfig, store: services::SharedStore) -> Router {
    let services = Arc::new(services::AppServices::new(config, store));
    let jwt: Arc<dyn JwtValidator> = services.jwt.clone();
    let auth_state = middleware::AuthState { jwt };

    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .merge(routes::public_router())
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
