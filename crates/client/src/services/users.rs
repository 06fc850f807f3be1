//! Administrator user management.

use bazaar_core::{UserId, UserRole};
use tracing::{info, instrument};

use crate::error::{ClientError, Result};
use crate::http::{ApiClient, ApiRequest};
use crate::models::{RegisterRequest, SessionUser, UserProfile, UserUpdate};

/// User management for administrators.
///
/// Goes through the same authenticated client as everything else; creating
/// a user never touches the administrator's own session.
#[derive(Clone)]
pub struct UserAdminService {
    api: ApiClient,
}

impl UserAdminService {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn require_admin(&self) -> Result<UserId> {
        self.api.auth().require_role(|role| role == UserRole::Admin)
    }

    /// Every user.
    ///
    /// # Errors
    ///
    /// `AuthRequired`/`Forbidden` unless signed in as an admin, otherwise the
    /// backend error.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<UserProfile>> {
        self.require_admin()?;
        self.api.send(ApiRequest::get("/api/users")).await
    }

    /// One user.
    ///
    /// # Errors
    ///
    /// Same as [`list`](Self::list).
    #[instrument(skip(self))]
    pub async fn get(&self, id: UserId) -> Result<UserProfile> {
        self.require_admin()?;
        self.api.send(ApiRequest::get(format!("/api/users/{id}"))).await
    }

    /// Create an account on someone's behalf.
    ///
    /// # Errors
    ///
    /// `Validation`/`InvalidEmail` for bad input, otherwise as [`list`](Self::list).
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register_user(&self, mut request: RegisterRequest) -> Result<UserProfile> {
        self.require_admin()?;
        request.validate()?;
        let created: SessionUser = self
            .api
            .send(ApiRequest::post("/api/users/register").json(&request)?)
            .await?;
        info!(user_id = %created.id, role = %created.role, "user created by admin");
        Ok(UserProfile {
            id: created.id,
            username: created.username,
            email: created.email,
            first_name: created.first_name,
            last_name: created.last_name,
            role: created.role,
            banned: None,
        })
    }

    /// Replace a user's details.
    ///
    /// # Errors
    ///
    /// Same as [`list`](Self::list).
    #[instrument(skip(self, update))]
    pub async fn update(&self, id: UserId, update: &UserUpdate) -> Result<UserProfile> {
        self.require_admin()?;
        let profile: UserProfile = self
            .api
            .send(ApiRequest::put(format!("/api/users/{id}")).json(update)?)
            .await?;
        self.api.auth().update_current_user(&profile)?;
        Ok(profile)
    }

    /// Promote a user to admin, or demote an admin to a plain user.
    ///
    /// # Errors
    ///
    /// `Validation` when an admin tries to demote themselves, otherwise as
    /// [`update`](Self::update).
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn toggle_admin(&self, user: &UserProfile) -> Result<UserProfile> {
        let admin_id = self.require_admin()?;
        if admin_id == user.id {
            return Err(ClientError::Validation(
                "You cannot change your own role".to_string(),
            ));
        }
        let mut update = UserUpdate::from(user);
        update.role = user.role.toggled_admin();
        info!(from = %user.role, to = %update.role, "toggling admin role");
        self.update(user.id, &update).await
    }

    /// Delete a user.
    ///
    /// # Errors
    ///
    /// `Validation` when an admin tries to delete themselves, otherwise as
    /// [`list`](Self::list).
    #[instrument(skip(self))]
    pub async fn delete(&self, id: UserId) -> Result<()> {
        let admin_id = self.require_admin()?;
        if admin_id == id {
            return Err(ClientError::Validation(
                "You cannot delete your own account here".to_string(),
            ));
        }
        self.api
            .send_empty(ApiRequest::delete(format!("/api/users/{id}")))
            .await?;
        info!("user deleted");
        Ok(())
    }
}
