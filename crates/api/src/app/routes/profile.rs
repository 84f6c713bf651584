use std::sync::Arc;

use axum::{
    extract::Extension,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use estore_auth::{Action, Module, PasswordChange, password_strength};
use estore_infra::services::ProfileChanges;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_profile).put(update_profile))
        .route("/password", post(change_password))
}

pub async fn get_profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Profile, Action::Read) {
        return denied;
    }
    match services.users.profile(principal.principal()).await {
        Ok(profile) => Json(profile).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<ProfileChanges>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Profile, Action::Update) {
        return denied;
    }
    match services.users.update_profile(principal.principal(), body).await {
        Ok(profile) => Json(profile).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<PasswordChange>,
) -> axum::response::Response {
    if let Err(denied) = require(&principal, Module::Profile, Action::Update) {
        return denied;
    }
    match services.users.change_password(principal.principal(), &body).await {
        Ok(()) => Json(serde_json::json!({
            "changed": true,
            "strength": password_strength(&body.new_password),
        }))
        .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
