//! `estore-auth`: token validation and the role permission matrix.
//!
//! No HTTP or storage here. Passwords and sessions live with the external
//! identity provider; this crate validates tokens and answers "may this
//! role do that in this module?".

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod user;

pub use authorize::{authorize, explain_authorization, AuthorizationExplanation, AuthzError};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use password::{PasswordChange, PasswordStrength, password_strength};
pub use permissions::{
    Action, Module, ModulePermissions, allowed_modules, can_access_module, can_create, can_delete,
    can_read, can_update, has_permission, module_permissions,
};
pub use principal::Principal;
pub use roles::Role;
pub use user::{UserProfile, UserStatus};
