//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: gateway/storage/identity wiring behind `AppServices`
//! - `routes/`: HTTP routes + handlers (one file per module)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use estore_infra::AppConfig;
use estore_infra::gateway::GatewayResult;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router with backends chosen from `config`.
pub async fn build_app(config: AppConfig) -> GatewayResult<Router> {
    let services = AppServices::from_config(config).await?;
    Ok(router(Arc::new(services)))
}

/// Assemble the router around already-wired services.
pub fn router(services: Arc<AppServices>) -> Router {
    let jwt = Arc::new(estore_auth::Hs256JwtValidator::new(services.config.jwt_secret_bytes()));
    let auth_state = middleware::AuthState { jwt };

    // Room for an oversized image to reach validation and get a JSON error.
    let body_limit = services.config.max_image_bytes.saturating_mul(2);

    // Protected routes: require a valid bearer token.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/storage/:bucket/*path", get(routes::system::storage_object))
        .merge(protected)
        .layer(Extension(services))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
}
