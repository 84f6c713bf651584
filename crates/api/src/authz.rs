//! API-side authorization guard.
//!
//! Every protected handler calls [`require`] with the module and action it
//! needs before touching any service.

use axum::http::StatusCode;
use axum::response::Response;

use estore_auth::{Action, Module, authorize};

use crate::app::errors;
use crate::context::PrincipalContext;

/// Check the permission matrix for the current principal; `403` when denied.
pub fn require(principal: &PrincipalContext, module: Module, action: Action) -> Result<(), Response> {
    authorize(principal.principal(), module, action)
        .map_err(|e| errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()))
}
