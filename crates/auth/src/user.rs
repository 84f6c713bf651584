//! User profiles (identity is owned by the external provider; this is the
//! directory record the warehouse keeps per account).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use estore_core::{DomainError, DomainResult, Entity, UserId};

use crate::Role;

// ─────────────────────────────────────────────────────────────────────────────
// User Status
// ─────────────────────────────────────────────────────────────────────────────

/// User account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "ACTIVE",
            UserStatus::Inactive => "INACTIVE",
        }
    }
}

impl core::str::FromStr for UserStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(UserStatus::Active),
            "INACTIVE" => Ok(UserStatus::Inactive),
            other => Err(DomainError::validation(format!("unknown user status '{other}'"))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// User Profile
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    pub last_active: Option<DateTime<Utc>>,
    pub avatar: Option<String>,
}

impl UserProfile {
    /// Build a new, active profile after validating name and email.
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: Role) -> DomainResult<Self> {
        let profile = Self {
            id: UserId::new(),
            name: name.into().trim().to_string(),
            email: normalize_email(&email.into()),
            role,
            status: UserStatus::Active,
            last_active: None,
            avatar: None,
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        validate_email(&self.email)
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

impl Entity for UserProfile {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Lower-case, trimmed email used as the lookup key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn validate_email(email: &str) -> DomainResult<()> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err(DomainError::validation("email must contain '@'"));
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(DomainError::validation(format!("invalid email '{email}'")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_profile_normalizes_email_and_starts_active() {
        let p = UserProfile::new(" Rina ", " Rina@Example.COM ", Role::Staff).unwrap();
        assert_eq!(p.name, "Rina");
        assert_eq!(p.email, "rina@example.com");
        assert!(p.is_active());
    }

    #[test]
    fn rejects_blank_name_and_bad_email() {
        assert!(UserProfile::new("", "a@b.co", Role::User).is_err());
        assert!(UserProfile::new("A", "not-an-email", Role::User).is_err());
        assert!(UserProfile::new("A", "a@localhost", Role::User).is_err());
    }
}
