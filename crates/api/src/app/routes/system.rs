use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::{StatusCode, header},
    response::IntoResponse,
    Json,
};

use estore_auth::{Module, allowed_modules, explain_authorization};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": principal.user_id().to_string(),
        "email": principal.actor(),
        "role": principal.role(),
        "allowed_modules": allowed_modules(principal.role()),
    }))
}

/// The caller's row of the permission matrix.
pub async fn permissions(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "role": principal.role(),
        "modules": dto::permission_row(principal.role()),
    }))
}

/// Why the caller's role is (or is not) allowed an action in a module.
pub async fn explain(
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::ExplainQuery>,
) -> axum::response::Response {
    let module: Module = match query.module.parse() {
        Ok(m) => m,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_module", format!("{e}")),
    };
    Json(explain_authorization(principal.role(), module, query.action)).into_response()
}

/// Public object download: `/storage/{bucket}/{path}`.
pub async fn storage_object(
    Extension(services): Extension<Arc<AppServices>>,
    Path((bucket, path)): Path<(String, String)>,
) -> axum::response::Response {
    if bucket != services.store.bucket() {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "unknown bucket");
    }
    match services.store.fetch(&path).await {
        Ok(obj) => ([(header::CONTENT_TYPE, obj.content_type)], obj.bytes).into_response(),
        Err(e) => errors::service_error_to_response(e.into()),
    }
}
