//! Identity provider boundary.
//!
//! Credentials are owned by an external identity service; the application
//! only asks it to change a user's password.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use estore_core::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("identity provider rejected the request: {0}")]
    Rejected(String),

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn update_password(&self, user: UserId, new_password: &str) -> Result<(), IdentityError>;
}

/// Records password changes without keeping the passwords.
#[derive(Debug, Default)]
pub struct InMemoryIdentityProvider {
    changed_at: RwLock<HashMap<UserId, DateTime<Utc>>>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn password_changed_at(&self, user: UserId) -> Option<DateTime<Utc>> {
        self.changed_at.read().ok()?.get(&user).copied()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn update_password(&self, user: UserId, new_password: &str) -> Result<(), IdentityError> {
        if new_password.is_empty() {
            return Err(IdentityError::Rejected("password cannot be empty".to_string()));
        }
        self.changed_at
            .write()
            .map_err(|_| IdentityError::Unavailable("identity state lock poisoned".to_string()))?
            .insert(user, Utc::now());
        Ok(())
    }
}
