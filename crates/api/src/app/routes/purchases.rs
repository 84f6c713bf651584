use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use estore_auth::{Action, Module};
use estore_core::RecordId;
use estore_purchasing::NewPurchaseOrder;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_purchase_orders).post(create_purchase_order))
        .route("/:id/status", post(update_purchase_status))
}

pub async fn list_purchase_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Purchase, Action::Read) {
        return denied;
    }
    match services.purchases.list().await {
        Ok(orders) => Json(orders).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<NewPurchaseOrder>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Purchase, Action::Create) {
        return denied;
    }
    match services.purchases.create(body).await {
        Ok(order) => (StatusCode::CREATED, Json(order)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_purchase_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::PurchaseStatusRequest>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Purchase, Action::Update) {
        return denied;
    }
    let id: RecordId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::invalid_id("purchase order", e),
    };
    match services.purchases.update_status(id, body.status).await {
        Ok(order) => Json(order).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
