//! Role → module → action permission matrix.
//!
//! The matrix is a fixed table expressed as a `match`; anything it does not
//! list is denied. A module that is not accessible grants no actions, even if
//! a caller asks for one explicitly.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use estore_core::DomainError;

use crate::Role;

/// Application area guarded by the matrix.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Module {
    Dashboard,
    Inventory,
    Purchase,
    Opname,
    Transactions,
    Users,
    Intelligence,
    Settings,
    Profile,
}

impl Module {
    /// All modules, in navigation order.
    pub const ALL: [Module; 9] = [
        Module::Dashboard,
        Module::Inventory,
        Module::Purchase,
        Module::Opname,
        Module::Transactions,
        Module::Users,
        Module::Intelligence,
        Module::Settings,
        Module::Profile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Dashboard => "dashboard",
            Module::Inventory => "inventory",
            Module::Purchase => "purchase",
            Module::Opname => "opname",
            Module::Transactions => "transactions",
            Module::Users => "users",
            Module::Intelligence => "intelligence",
            Module::Settings => "settings",
            Module::Profile => "profile",
        }
    }
}

impl core::fmt::Display for Module {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Module::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::validation(format!("unknown module '{s}'")))
    }
}

/// Operation on a module.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cell of the matrix.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct ModulePermissions {
    pub can_access: bool,
    pub actions: &'static [Action],
}

const CRUD: &[Action] = &[Action::Read, Action::Create, Action::Update, Action::Delete];
const READ_CREATE_UPDATE: &[Action] = &[Action::Read, Action::Create, Action::Update];
const READ_CREATE: &[Action] = &[Action::Read, Action::Create];
const READ_UPDATE: &[Action] = &[Action::Read, Action::Update];
const READ: &[Action] = &[Action::Read];

const DENIED: ModulePermissions = ModulePermissions {
    can_access: false,
    actions: &[],
};

const fn allow(actions: &'static [Action]) -> ModulePermissions {
    ModulePermissions {
        can_access: true,
        actions,
    }
}

/// Look up the matrix cell for a role/module pair.
pub fn module_permissions(role: Role, module: Module) -> ModulePermissions {
    use Module::*;

    match (role, module) {
        (Role::Admin, Profile) => allow(READ_UPDATE),
        (Role::Admin, _) => allow(CRUD),

        (Role::Staff, Dashboard) => allow(READ_CREATE_UPDATE),
        (Role::Staff, Inventory) => allow(CRUD),
        (Role::Staff, Purchase) => allow(READ_CREATE_UPDATE),
        (Role::Staff, Opname) => allow(READ_CREATE_UPDATE),
        (Role::Staff, Transactions) => allow(READ_CREATE),
        (Role::Staff, Profile) => allow(READ_UPDATE),
        (Role::Staff, Users | Intelligence | Settings) => DENIED,

        (Role::User, Dashboard | Inventory | Transactions) => allow(READ),
        (Role::User, Profile) => allow(READ_UPDATE),
        (Role::User, Purchase | Opname | Users | Intelligence | Settings) => DENIED,
    }
}

pub fn can_access_module(role: Role, module: Module) -> bool {
    module_permissions(role, module).can_access
}

pub fn has_permission(role: Role, module: Module, action: Action) -> bool {
    let cell = module_permissions(role, module);
    cell.can_access && cell.actions.contains(&action)
}

pub fn can_read(role: Role, module: Module) -> bool {
    has_permission(role, module, Action::Read)
}

pub fn can_create(role: Role, module: Module) -> bool {
    has_permission(role, module, Action::Create)
}

pub fn can_update(role: Role, module: Module) -> bool {
    has_permission(role, module, Action::Update)
}

pub fn can_delete(role: Role, module: Module) -> bool {
    has_permission(role, module, Action::Delete)
}

/// Modules a role may open, in navigation order.
pub fn allowed_modules(role: Role) -> Vec<Module> {
    Module::ALL
        .into_iter()
        .filter(|m| can_access_module(role, *m))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn admin_has_full_access_except_profile_delete() {
        for module in Module::ALL {
            assert!(can_access_module(Role::Admin, module));
            assert!(can_read(Role::Admin, module));
        }
        assert!(can_delete(Role::Admin, Module::Users));
        assert!(!can_delete(Role::Admin, Module::Profile));
        assert!(!can_create(Role::Admin, Module::Profile));
    }

    #[test]
    fn staff_cannot_reach_admin_modules() {
        assert!(!can_access_module(Role::Staff, Module::Users));
        assert!(!can_access_module(Role::Staff, Module::Settings));
        assert!(!can_access_module(Role::Staff, Module::Intelligence));
        assert!(can_create(Role::Staff, Module::Transactions));
        assert!(!can_update(Role::Staff, Module::Transactions));
        assert!(!can_delete(Role::Staff, Module::Purchase));
        assert!(can_delete(Role::Staff, Module::Inventory));
    }

    #[test]
    fn user_is_read_only() {
        assert!(can_read(Role::User, Module::Inventory));
        assert!(!can_create(Role::User, Module::Inventory));
        assert!(can_read(Role::User, Module::Transactions));
        assert!(!can_create(Role::User, Module::Transactions));
        assert!(!can_access_module(Role::User, Module::Purchase));
        assert!(can_update(Role::User, Module::Profile));
    }

    #[test]
    fn inaccessible_module_grants_nothing() {
        for action in [Action::Read, Action::Create, Action::Update, Action::Delete] {
            assert!(!has_permission(Role::User, Module::Opname, action));
            assert!(!has_permission(Role::Staff, Module::Users, action));
        }
    }

    #[test]
    fn allowed_modules_follow_navigation_order() {
        assert_eq!(
            allowed_modules(Role::User),
            vec![
                Module::Dashboard,
                Module::Inventory,
                Module::Transactions,
                Module::Profile
            ]
        );
        assert_eq!(allowed_modules(Role::Admin).len(), Module::ALL.len());
    }

    #[test]
    fn module_parses_from_str() {
        assert_eq!("Opname".parse::<Module>().unwrap(), Module::Opname);
        assert!("billing".parse::<Module>().is_err());
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    fn any_module() -> impl Strategy<Value = Module> {
        prop::sample::select(Module::ALL.to_vec())
    }

    fn any_action() -> impl Strategy<Value = Action> {
        prop::sample::select(vec![Action::Read, Action::Create, Action::Update, Action::Delete])
    }

    proptest! {
        #[test]
        fn any_granted_action_implies_read_and_access(role in any_role(), module in any_module(), action in any_action()) {
            if has_permission(role, module, action) {
                prop_assert!(can_access_module(role, module));
                prop_assert!(can_read(role, module));
            }
        }

        #[test]
        fn admin_dominates_other_roles(role in any_role(), module in any_module(), action in any_action()) {
            if has_permission(role, module, action) {
                prop_assert!(has_permission(Role::Admin, module, action));
            }
        }
    }
}
