use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use pvz_auth::Role;
use pvz_core::UserId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// Issue a token for a throwaway identity with the requested role.
pub async fn dummy_login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::DummyLoginRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::bad_request(e.body_text()),
    };
    let role: Role = match body.role.parse() {
        Ok(r) => r,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_role", format!("{e}")),
    };

    match services.jwt.issue(UserId::new(), role, Utc::now()) {
        Ok(token) => (StatusCode::OK, Json(token)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "token signing failed");
            errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "token_error",
                "failed to issue token",
            )
        }
    }
}

/// Create an account. Responds 201 with the account (no password hash).
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::RegisterRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::bad_request(e.body_text()),
    };
    let role: Role = match body.role.parse() {
        Ok(r) => r,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_role", format!("{e}")),
    };

    match services
        .accounts
        .register(&body.email, &body.password, role, services.deadline())
        .await
    {
        Ok(user) => (StatusCode::CREATED, Json(dto::UserDto::from(&user))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Exchange email and password for a token.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::LoginRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::bad_request(e.body_text()),
    };

    match services
        .accounts
        .login(&body.email, &body.password, services.deadline())
        .await
    {
        Ok(token) => (StatusCode::OK, Json(token)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
