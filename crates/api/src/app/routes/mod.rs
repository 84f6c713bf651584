use axum::{routing::get, Router};

pub mod inventory;
pub mod opname;
pub mod profile;
pub mod purchases;
pub mod system;
pub mod transactions;
pub mod users;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/permissions", get(system::permissions))
        .route("/permissions/explain", get(system::explain))
        .nest("/inventory", inventory::router())
        .nest("/transactions", transactions::router())
        .nest("/purchases", purchases::router())
        .nest("/opname", opname::router())
        .nest("/users", users::router())
        .nest("/profile", profile::router())
}
