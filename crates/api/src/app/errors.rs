use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use estore_infra::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        ServiceError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        ServiceError::NotFound(what) => json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found")),
        ServiceError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        ServiceError::InsufficientStock {
            available,
            requested,
        } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            axum::Json(json!({
                "error": "insufficient_stock",
                "message": format!("requested {requested} but only {available} on hand"),
                "available": available,
                "requested": requested,
            })),
        )
            .into_response(),
        ServiceError::Unauthorized => json_error(StatusCode::FORBIDDEN, "forbidden", "forbidden"),
        ServiceError::Backend(msg) => {
            tracing::error!(error = %msg, "persistence backend failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "backend_error", "persistence backend failure")
        }
        ServiceError::Storage(e) => {
            tracing::error!(error = %e, "object storage failure");
            json_error(StatusCode::BAD_GATEWAY, "storage_error", e.to_string())
        }
        ServiceError::Identity(e) => {
            tracing::warn!(error = %e, "identity provider failure");
            json_error(StatusCode::BAD_GATEWAY, "identity_error", e.to_string())
        }
    }
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

pub fn invalid_id(what: &str, err: impl std::fmt::Display) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        let cases = [
            (ServiceError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::not_found("item"), StatusCode::NOT_FOUND),
            (ServiceError::Conflict("dup".into()), StatusCode::CONFLICT),
            (
                ServiceError::InsufficientStock {
                    available: 1.0,
                    requested: 2.0,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (ServiceError::Backend("db".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(service_error_to_response(err).status(), status);
        }
    }
}
