use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use estore_auth::{Action, Module};
use estore_inventory::{Direction, InboundRequest, LedgerQuery, OutboundRequest};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_grouped))
        .route("/raw", get(list_raw))
        .route("/ledger", get(list_ledger))
        .route("/inbound", post(create_inbound))
        .route("/outbound", post(create_outbound))
}

/// Document groups for one direction tab (default `OUT`), paged.
pub async fn list_grouped(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::TransactionListQuery>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Transactions, Action::Read) {
        return denied;
    }

    let direction = match query.direction.as_deref().map(str::parse::<Direction>) {
        None => Direction::Out,
        Some(Ok(d)) => d,
        Some(Err(e)) => return errors::service_error_to_response(e.into()),
    };
    let ledger_query = LedgerQuery::new(direction, query.search.unwrap_or_default());

    match services
        .transactions
        .grouped_page(&ledger_query, query.page.unwrap_or(1))
        .await
    {
        Ok(page) => Json(page).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_raw(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Transactions, Action::Read) {
        return denied;
    }
    match services.transactions.list().await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_ledger(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::LedgerQueryParams>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Transactions, Action::Read) {
        return denied;
    }
    let material_no = query.material_no.as_deref().map(str::trim).filter(|m| !m.is_empty());
    match services.transactions.ledger(material_no).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_inbound(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<InboundRequest>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Transactions, Action::Create) {
        return denied;
    }
    match services.transactions.create_inbound(&body, principal.actor()).await {
        Ok(receipt) => (StatusCode::CREATED, Json(receipt)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_outbound(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<OutboundRequest>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Transactions, Action::Create) {
        return denied;
    }
    match services.transactions.create_outbound(&body, principal.actor()).await {
        Ok(receipt) => (StatusCode::CREATED, Json(receipt)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
