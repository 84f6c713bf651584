use core::str::FromStr;

use serde::{Deserialize, Serialize};

use estore_core::DomainError;

/// Role identifier used for RBAC.
///
/// The set is closed: a user's role fully determines which modules and
/// actions are available (see [`crate::permissions`]).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Staff,
    User,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Staff, Role::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Staff => "STAFF",
            Role::User => "USER",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "STAFF" => Ok(Role::Staff),
            "USER" => Ok(Role::User),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("staff".parse::<Role>().unwrap(), Role::Staff);
        assert_eq!(" ADMIN ".parse::<Role>().unwrap(), Role::Admin);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"USER\"");
    }
}
