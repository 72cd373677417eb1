use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use pvz_core::DomainError;
use pvz_infra::ServiceError;

/// Map an engine/directory failure to an HTTP response.
///
/// Domain rejections are the caller's to fix (4xx); storage failures are
/// reported without internals; an expired deadline is a gateway timeout.
pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Store { .. } => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            "internal server error",
        ),
        ServiceError::Credentials { .. } => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "credentials_error",
            "internal server error",
        ),
        ServiceError::DeadlineExceeded { operation } => json_error(
            StatusCode::GATEWAY_TIMEOUT,
            "deadline_exceeded",
            format!("{operation} did not complete in time"),
        ),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let (status, code) = match &err {
        DomainError::PvzNotFound { .. } => (StatusCode::NOT_FOUND, "pvz_not_found"),
        DomainError::ReceptionAlreadyOpen { .. } => {
            (StatusCode::BAD_REQUEST, "reception_already_open")
        }
        DomainError::NoReceptionInProgress { .. } => {
            (StatusCode::BAD_REQUEST, "no_reception_in_progress")
        }
        DomainError::NoProductsInReception { .. } => {
            (StatusCode::BAD_REQUEST, "no_products_in_reception")
        }
        DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        DomainError::InvalidId(_) => (StatusCode::BAD_REQUEST, "invalid_id"),
        DomainError::EmailTaken { .. } => (StatusCode::BAD_REQUEST, "email_taken"),
        DomainError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
    };
    json_error(status, code, err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn bad_request(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "bad_request", message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pvz_core::PvzId;
    use pvz_infra::StoreError;

    #[test]
    fn status_follows_error_kind() {
        let pvz_id = PvzId::new();
        let cases = [
            (ServiceError::from(DomainError::PvzNotFound { pvz_id }), StatusCode::NOT_FOUND),
            (
                ServiceError::from(DomainError::ReceptionAlreadyOpen { pvz_id }),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::store("insert_product")(StoreError::Backend("down".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ServiceError::from(DomainError::InvalidCredentials),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ServiceError::from(DomainError::EmailTaken { email: "a@b.c".into() }),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::credentials("register")("join error".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ServiceError::DeadlineExceeded { operation: "open_reception" },
                StatusCode::GATEWAY_TIMEOUT,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(service_error_to_response(err).status(), status);
        }
    }
}
