use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use estore_auth::{Action, Module};
use estore_inventory::{ImageUpload, ItemCategory, ItemKey};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/items", get(list_items).post(create_item))
        .route("/items/:id", get(get_item).put(update_item).delete(delete_item))
        .route("/items/:id/image", axum::routing::put(upload_image).delete(remove_image))
}

fn parse_key(id: &str) -> Result<ItemKey, axum::response::Response> {
    id.parse().map_err(|e| errors::invalid_id("item", e))
}

pub async fn list_categories(Extension(principal): Extension<PrincipalContext>) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Inventory, Action::Read) {
        return denied;
    }
    Json(ItemCategory::ALL).into_response()
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::ItemListQuery>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Inventory, Action::Read) {
        return denied;
    }

    let items = match services.items.list().await {
        Ok(v) => v,
        Err(e) => return errors::service_error_to_response(e),
    };

    let category = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let items: Vec<dto::ItemResponse> = items
        .into_iter()
        .filter(|i| !query.low_stock.unwrap_or(false) || i.is_low_stock())
        .filter(|i| category.is_none_or(|c| i.display_category().eq_ignore_ascii_case(c)))
        .map(Into::into)
        .collect();

    Json(items).into_response()
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Inventory, Action::Read) {
        return denied;
    }
    let key = match parse_key(&id) {
        Ok(k) => k,
        Err(resp) => return resp,
    };

    match services.items.get(&key).await {
        Ok(item) => Json(dto::ItemResponse::from(item)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateItemRequest>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Inventory, Action::Create) {
        return denied;
    }
    let key = match ItemKey::new(body.key.material_no, body.key.sloc) {
        Ok(k) => k,
        Err(e) => return errors::service_error_to_response(e.into()),
    };

    match services.items.create(body.fields.into_item(key), principal.actor()).await {
        Ok(item) => (StatusCode::CREATED, Json(dto::ItemResponse::from(item))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ItemFields>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Inventory, Action::Update) {
        return denied;
    }
    let key = match parse_key(&id) {
        Ok(k) => k,
        Err(resp) => return resp,
    };

    match services.items.update(body.into_item(key), principal.actor()).await {
        Ok(item) => Json(dto::ItemResponse::from(item)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Inventory, Action::Delete) {
        return denied;
    }
    let key = match parse_key(&id) {
        Ok(k) => k,
        Err(resp) => return resp,
    };

    match services.items.delete(&key).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Raw image body; the MIME type comes from `Content-Type`.
pub async fn upload_image(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Query(query): Query<dto::ImageQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Inventory, Action::Update) {
        return denied;
    }
    let key = match parse_key(&id) {
        Ok(k) => k,
        Err(resp) => return resp,
    };

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let upload = ImageUpload::new(query.filename.unwrap_or_default(), content_type, body.len());

    match services.items.set_image(&key, upload, body.to_vec(), principal.actor()).await {
        Ok(item) => Json(dto::ItemResponse::from(item)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn remove_image(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Inventory, Action::Update) {
        return denied;
    }
    let key = match parse_key(&id) {
        Ok(k) => k,
        Err(resp) => return resp,
    };

    match services.items.remove_image(&key, principal.actor()).await {
        Ok(item) => Json(dto::ItemResponse::from(item)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
