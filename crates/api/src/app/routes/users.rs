use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use estore_auth::{Action, Module};
use estore_core::UserId;
use estore_infra::services::UserChanges;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

fn parse_user_id(id: &str) -> Result<UserId, axum::response::Response> {
    id.parse().map_err(|e| errors::invalid_id("user", e))
}

/// All users, or the single user matching `?email=`.
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::UserListQuery>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Users, Action::Read) {
        return denied;
    }
    let result = match query.email.as_deref() {
        Some(email) => services.users.find_by_email(email).await.map(|u| vec![u]),
        None => services.users.list().await,
    };
    match result {
        Ok(users) => Json(users).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Users, Action::Read) {
        return denied;
    }
    let id = match parse_user_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.users.get(id).await {
        Ok(user) => Json(user).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateUserRequest>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Users, Action::Create) {
        return denied;
    }
    match services.users.create(&body.name, &body.email, body.role).await {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<UserChanges>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Users, Action::Update) {
        return denied;
    }
    let id = match parse_user_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.users.update(id, body).await {
        Ok(user) => Json(user).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Users, Action::Delete) {
        return denied;
    }
    let id = match parse_user_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.users.delete(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
