//! Password change policy applied before calling the identity provider.

use serde::{Deserialize, Serialize};

use estore_core::{DomainError, DomainResult};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PasswordStrength {
    Weak,
    Medium,
    Strong,
}

/// Length-based strength hint.
pub fn password_strength(password: &str) -> PasswordStrength {
    match password.chars().count() {
        n if n < MIN_PASSWORD_LEN => PasswordStrength::Weak,
        n if n < 10 => PasswordStrength::Medium,
        _ => PasswordStrength::Strong,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChange {
    pub new_password: String,
    pub confirm_password: String,
}

impl PasswordChange {
    pub fn validate(&self) -> DomainResult<()> {
        if self.new_password != self.confirm_password {
            return Err(DomainError::validation("new passwords do not match"));
        }
        if self.new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strength_buckets() {
        assert_eq!(password_strength("abc"), PasswordStrength::Weak);
        assert_eq!(password_strength("abcdefg"), PasswordStrength::Medium);
        assert_eq!(password_strength("abcdefghijk"), PasswordStrength::Strong);
    }

    #[test]
    fn change_requires_match_and_length() {
        let mismatch = PasswordChange {
            new_password: "abcdef".into(),
            confirm_password: "abcdeg".into(),
        };
        assert!(mismatch.validate().is_err());

        let short = PasswordChange {
            new_password: "abc".into(),
            confirm_password: "abc".into(),
        };
        assert!(short.validate().is_err());

        let ok = PasswordChange {
            new_password: "abcdef".into(),
            confirm_password: "abcdef".into(),
        };
        assert!(ok.validate().is_ok());
    }
}
