use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use estore_auth::{Action, Module};
use estore_core::RecordId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions/:id", get(get_session))
        .route("/sessions/:id/items", get(list_session_items))
        .route("/sessions/:id/stats", get(session_stats))
        .route("/sessions/:id/finalize", post(finalize_session))
        .route("/sessions/:id/cancel", post(cancel_session))
        .route("/items/:id/count", post(record_count))
}

fn parse_id(what: &str, id: &str) -> Result<RecordId, axum::response::Response> {
    id.parse().map_err(|e| errors::invalid_id(what, e))
}

pub async fn list_sessions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Opname, Action::Read) {
        return denied;
    }
    match services.opname.list_sessions().await {
        Ok(sessions) => Json(sessions).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_session(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateSessionRequest>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Opname, Action::Create) {
        return denied;
    }
    match services
        .opname
        .create_session(&body.title, body.notes, principal.actor())
        .await
    {
        Ok(session) => (StatusCode::CREATED, Json(session)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_session(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Opname, Action::Read) {
        return denied;
    }
    let id = match parse_id("session", &id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.opname.get_session(id).await {
        Ok(session) => Json(session).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_session_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Query(query): Query<dto::PageQuery>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Opname, Action::Read) {
        return denied;
    }
    let id = match parse_id("session", &id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services
        .opname
        .items_page(id, query.page.unwrap_or(1), query.page_size)
        .await
    {
        Ok(page) => Json(page).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn session_stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Opname, Action::Read) {
        return denied;
    }
    let id = match parse_id("session", &id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.opname.stats(id).await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn record_count(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::CountRequest>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Opname, Action::Update) {
        return denied;
    }
    let id = match parse_id("opname item", &id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.opname.update_count(id, body.physical_qty).await {
        Ok(line) => Json(line).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn finalize_session(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Opname, Action::Update) {
        return denied;
    }
    let id = match parse_id("session", &id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.opname.finalize(id, principal.actor()).await {
        Ok(session) => Json(session).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn cancel_session(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Opname, Action::Update) {
        return denied;
    }
    let id = match parse_id("session", &id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.opname.cancel(id).await {
        Ok(session) => Json(session).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
