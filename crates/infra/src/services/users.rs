//! User profiles, the caller's own profile and password changes.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, instrument};

use estore_auth::{PasswordChange, Principal, Role, UserProfile, UserStatus, user::normalize_email};
use estore_core::UserId;

use crate::gateway::UserGateway;
use crate::identity::IdentityProvider;

use super::error::{ServiceError, ServiceResult};

/// Administrative edit of a profile. Absent fields stay unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub status: Option<UserStatus>,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Self-service edit: name and avatar only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

pub struct UserService {
    users: Arc<dyn UserGateway>,
    identity: Arc<dyn IdentityProvider>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserGateway>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { users, identity }
    }

    pub async fn list(&self) -> ServiceResult<Vec<UserProfile>> {
        Ok(self.users.list_users().await?)
    }

    pub async fn get(&self, id: UserId) -> ServiceResult<UserProfile> {
        self.users
            .get_user(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("user {id}")))
    }

    pub async fn find_by_email(&self, email: &str) -> ServiceResult<UserProfile> {
        self.users
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("user {}", normalize_email(email))))
    }

    #[instrument(skip(self, name), err)]
    pub async fn create(&self, name: &str, email: &str, role: Role) -> ServiceResult<UserProfile> {
        let profile = UserProfile::new(name, email, role)?;
        if self.users.find_user_by_email(&profile.email).await?.is_some() {
            return Err(ServiceError::Conflict(format!("email {} is already registered", profile.email)));
        }
        self.users.insert_user(&profile).await?;
        info!(user_id = %profile.id, "user created");
        Ok(profile)
    }

    #[instrument(skip(self, changes), fields(user_id = %id), err)]
    pub async fn update(&self, id: UserId, changes: UserChanges) -> ServiceResult<UserProfile> {
        let mut profile = self.get(id).await?;
        if let Some(email) = changes.email {
            let email = normalize_email(&email);
            if email != profile.email {
                if self.users.find_user_by_email(&email).await?.is_some() {
                    return Err(ServiceError::Conflict(format!("email {email} is already registered")));
                }
                profile.email = email;
            }
        }
        if let Some(name) = changes.name {
            profile.name = name.trim().to_string();
        }
        if let Some(role) = changes.role {
            profile.role = role;
        }
        if let Some(status) = changes.status {
            profile.status = status;
        }
        if let Some(avatar) = changes.avatar {
            profile.avatar = Some(avatar).filter(|a| !a.trim().is_empty());
        }
        profile.validate()?;
        self.users.update_user(&profile).await?;
        Ok(profile)
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    pub async fn delete(&self, id: UserId) -> ServiceResult<()> {
        self.users.delete_user(id).await?;
        info!("user deleted");
        Ok(())
    }

    /// The caller's profile, looked up by id and then by email.
    pub async fn profile(&self, principal: &Principal) -> ServiceResult<UserProfile> {
        if let Some(profile) = self.users.get_user(principal.user_id).await? {
            return Ok(profile);
        }
        self.find_by_email(&principal.email).await
    }

    pub async fn update_profile(&self, principal: &Principal, changes: ProfileChanges) -> ServiceResult<UserProfile> {
        let profile = self.profile(principal).await?;
        self.update(
            profile.id,
            UserChanges {
                name: changes.name,
                avatar: changes.avatar,
                ..UserChanges::default()
            },
        )
        .await
    }

    #[instrument(skip(self, principal, change), fields(user_id = %principal.user_id), err)]
    pub async fn change_password(&self, principal: &Principal, change: &PasswordChange) -> ServiceResult<()> {
        change.validate()?;
        self.identity.update_password(principal.user_id, &change.new_password).await?;
        info!("password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryGateway;
    use crate::identity::InMemoryIdentityProvider;

    fn service() -> (UserService, Arc<InMemoryIdentityProvider>) {
        let idp = Arc::new(InMemoryIdentityProvider::new());
        (UserService::new(Arc::new(InMemoryGateway::new()), idp.clone()), idp)
    }

    #[tokio::test]
    async fn emails_are_unique_after_normalization() {
        let (svc, _) = service();
        svc.create("Ana", "ana@example.com", Role::Staff).await.unwrap();
        let err = svc.create("Ana 2", " ANA@example.com ", Role::User).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(svc.find_by_email("Ana@Example.com").await.unwrap().name, "Ana");
    }

    #[tokio::test]
    async fn update_applies_only_given_fields() {
        let (svc, _) = service();
        let user = svc.create("Budi", "budi@example.com", Role::User).await.unwrap();
        let updated = svc
            .update(
                user.id,
                UserChanges {
                    role: Some(Role::Admin),
                    status: Some(UserStatus::Inactive),
                    ..UserChanges::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.role, Role::Admin);
        assert!(!updated.is_active());
        assert_eq!(updated.name, "Budi");
    }

    #[tokio::test]
    async fn profile_falls_back_to_email_and_edits_name_only() {
        let (svc, _) = service();
        let user = svc.create("Citra", "citra@example.com", Role::Staff).await.unwrap();
        let principal = Principal::new(UserId::new(), "citra@example.com", Role::Staff);

        let updated = svc
            .update_profile(
                &principal,
                ProfileChanges {
                    name: Some("Citra W".into()),
                    avatar: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.id, user.id);
        assert_eq!(updated.name, "Citra W");
        assert_eq!(updated.role, Role::Staff);
    }

    #[tokio::test]
    async fn password_change_is_validated_before_reaching_provider() {
        let (svc, idp) = service();
        let principal = Principal::new(UserId::new(), "x@example.com", Role::User);
        let mismatch = PasswordChange {
            new_password: "secret123".into(),
            confirm_password: "secret124".into(),
        };
        assert!(matches!(
            svc.change_password(&principal, &mismatch).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(idp.password_changed_at(principal.user_id).is_none());

        let ok = PasswordChange {
            new_password: "secret123".into(),
            confirm_password: "secret123".into(),
        };
        svc.change_password(&principal, &ok).await.unwrap();
        assert!(idp.password_changed_at(principal.user_id).is_some());
    }
}
