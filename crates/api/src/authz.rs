//! API-side authorization guard.
//!
//! Handlers call this before touching the engine or the directory.

use axum::http::StatusCode;
use axum::response::Response;

use pvz_auth::{Permission, authorize};

use crate::app::errors;
use crate::context::PrincipalContext;

/// Check that the caller's role grants `required`; a 403 response otherwise.
pub fn require(principal: &PrincipalContext, required: &Permission) -> Result<(), Response> {
    authorize(&principal.to_principal(), required).map_err(|e| {
        tracing::debug!(
            principal_id = %principal.principal_id(),
            role = %principal.role(),
            permission = %required,
            "access denied"
        );
        errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string())
    })
}
