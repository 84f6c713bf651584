use serde::Serialize;
use thiserror::Error;

use crate::permissions::{Action, Module, has_permission, module_permissions};
use crate::{Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: role {role} may not {action} in {module}")]
    Forbidden {
        role: Role,
        module: Module,
        action: Action,
    },
}

/// Authorize a principal for one action in one module.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, module: Module, action: Action) -> Result<(), AuthzError> {
    if has_permission(principal.role, module, action) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %principal.user_id,
            role = %principal.role,
            %module,
            %action,
            "authorization denied"
        );
        Err(AuthzError::Forbidden {
            role: principal.role,
            module,
            action,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub role: Role,
    pub module: Module,
    pub action: Action,
    pub granted: bool,
    pub reason: String,
    /// Actions the role holds in the module (empty when the module is closed).
    pub granted_actions: Vec<Action>,
    /// Roles that would be allowed to perform the action.
    pub roles_with_access: Vec<Role>,
}

/// Explain why an authorization decision was made (or would be made).
pub fn explain_authorization(role: Role, module: Module, action: Action) -> AuthorizationExplanation {
    let cell = module_permissions(role, module);
    let granted = has_permission(role, module, action);

    let reason = if granted {
        format!("role {role} holds '{action}' in module '{module}'")
    } else if !cell.can_access {
        format!("role {role} cannot access module '{module}'")
    } else {
        format!("role {role} may open '{module}' but does not hold '{action}'")
    };

    AuthorizationExplanation {
        role,
        module,
        action,
        granted,
        reason,
        granted_actions: if cell.can_access { cell.actions.to_vec() } else { Vec::new() },
        roles_with_access: Role::ALL
            .into_iter()
            .filter(|r| has_permission(*r, module, action))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estore_core::UserId;

    #[test]
    fn authorize_passes_matrix_grants() {
        let p = Principal::new(UserId::new(), "staff@example.com", Role::Staff);
        assert!(authorize(&p, Module::Inventory, Action::Delete).is_ok());
        let err = authorize(&p, Module::Users, Action::Read).unwrap_err();
        assert_eq!(
            err,
            AuthzError::Forbidden {
                role: Role::Staff,
                module: Module::Users,
                action: Action::Read
            }
        );
    }

    #[test]
    fn explanation_lists_roles_that_would_be_allowed() {
        let e = explain_authorization(Role::User, Module::Transactions, Action::Create);
        assert!(!e.granted);
        assert_eq!(e.granted_actions, vec![Action::Read]);
        assert_eq!(e.roles_with_access, vec![Role::Admin, Role::Staff]);

        let closed = explain_authorization(Role::User, Module::Settings, Action::Read);
        assert!(closed.reason.contains("cannot access"));
        assert!(closed.granted_actions.is_empty());
    }
}
