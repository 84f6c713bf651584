use thiserror::Error;

use estore_core::DomainError;

use crate::gateway::GatewayError;
use crate::identity::IdentityError;
use crate::storage::StorageError;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failure of an application service, normalized across the domain,
/// gateway, storage and identity layers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ServiceError {
    /// Deterministic input failure.
    #[error("{0}")]
    Validation(String),

    /// Operation not allowed in the current state (closed session, terminal order).
    #[error("{0}")]
    InvariantViolation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: f64, requested: f64 },

    #[error("unauthorized")]
    Unauthorized,

    /// Persistence backend failed.
    #[error("{0}")]
    Backend(String),

    #[error(transparent)]
    Storage(StorageError),

    #[error(transparent)]
    Identity(IdentityError),
}

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => ServiceError::Validation(msg),
            DomainError::InvariantViolation(msg) => ServiceError::InvariantViolation(msg),
            DomainError::NotFound => ServiceError::NotFound("record".to_string()),
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
            DomainError::Unauthorized => ServiceError::Unauthorized,
            DomainError::InsufficientStock {
                available,
                requested,
            } => ServiceError::InsufficientStock {
                available,
                requested,
            },
        }
    }
}

impl From<GatewayError> for ServiceError {
    fn from(value: GatewayError) -> Self {
        match value {
            GatewayError::NotFound(what) => ServiceError::NotFound(what),
            GatewayError::Conflict(msg) => ServiceError::Conflict(msg),
            GatewayError::InvalidState(msg) => ServiceError::InvariantViolation(msg),
            GatewayError::InsufficientStock {
                available,
                requested,
            } => ServiceError::InsufficientStock {
                available,
                requested,
            },
            GatewayError::InvalidRow(msg) | GatewayError::Backend(msg) => ServiceError::Backend(msg),
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::NotFound(path) => ServiceError::NotFound(format!("object {path}")),
            other => ServiceError::Storage(other),
        }
    }
}

impl From<IdentityError> for ServiceError {
    fn from(value: IdentityError) -> Self {
        ServiceError::Identity(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_shortfall_survives_both_layers() {
        let from_domain: ServiceError = DomainError::insufficient_stock(10.0, 15.0).into();
        let from_gateway: ServiceError = GatewayError::InsufficientStock {
            available: 10.0,
            requested: 15.0,
        }
        .into();
        assert_eq!(from_domain, from_gateway);
    }

    #[test]
    fn lost_status_race_is_an_invariant_violation() {
        let err: ServiceError = GatewayError::InvalidState("opname session is CANCELLED".into()).into();
        assert!(matches!(err, ServiceError::InvariantViolation(_)));
    }

    #[test]
    fn invalid_rows_are_backend_failures() {
        let err: ServiceError = GatewayError::InvalidRow("status".into()).into();
        assert!(matches!(err, ServiceError::Backend(_)));
    }
}
