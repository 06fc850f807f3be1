//! Sign-in, registration and the signed-in user's own profile.

use bazaar_core::{Email, UserRole};
use tracing::{info, instrument};

use crate::auth::AuthGate;
use crate::error::{ClientError, Result};
use crate::http::{ApiClient, ApiRequest};
use crate::models::{
    ChangePasswordRequest, CurrentUser, LoginRequest, RegisterRequest, SessionUser, UserProfile,
    UserUpdate,
};

/// Account operations for the person using this client.
#[derive(Clone)]
pub struct AccountService {
    api: ApiClient,
}

impl AccountService {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn auth(&self) -> &AuthGate {
        self.api.auth()
    }

    /// Sign in and persist the session.
    ///
    /// # Errors
    ///
    /// `InvalidEmail` for a malformed address (nothing is sent), `Validation`
    /// for an empty password, otherwise the backend error (401 for wrong
    /// credentials).
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<CurrentUser> {
        let email = Email::parse(email)?;
        if password.is_empty() {
            return Err(ClientError::Validation(
                "Password is required".to_string(),
            ));
        }
        let session: SessionUser = self
            .api
            .send(ApiRequest::post("/api/users/login").json(&LoginRequest {
                email: email.as_str(),
                password,
            })?)
            .await?;
        self.auth().sign_in(session)
    }

    /// Create an account and sign in as it.
    ///
    /// Names default to empty and the role to `USER` when not given.
    ///
    /// # Errors
    ///
    /// `Validation`/`InvalidEmail` for bad input (nothing is sent), otherwise
    /// the backend error (409 when the user exists).
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, mut request: RegisterRequest) -> Result<CurrentUser> {
        request.validate()?;
        let session: SessionUser = self
            .api
            .send(ApiRequest::post("/api/users/register").json(&request)?)
            .await?;
        info!(user_id = %session.id, "account registered");
        self.auth().sign_in(session)
    }

    /// Sign out locally.
    ///
    /// # Errors
    ///
    /// Returns an error if the stores cannot be cleared.
    pub fn logout(&self) -> Result<()> {
        self.auth().logout()
    }

    /// The signed-in user's profile from the backend.
    ///
    /// # Errors
    ///
    /// `AuthRequired` when signed out, otherwise the backend error.
    #[instrument(skip(self))]
    pub async fn profile(&self) -> Result<UserProfile> {
        let user_id = self.auth().require_user()?;
        self.api
            .send(ApiRequest::get(format!("/api/users/{user_id}")))
            .await
    }

    /// Update name and contact details. The role cannot be changed here.
    ///
    /// # Errors
    ///
    /// `AuthRequired` when signed out, `InvalidEmail` for a malformed email,
    /// otherwise the backend error.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, mut update: UserUpdate) -> Result<UserProfile> {
        let user_id = self.auth().require_user()?;
        update.email = Email::parse(&update.email)?.to_string();
        update.role = self.auth().role().unwrap_or(UserRole::User);
        let profile: UserProfile = self
            .api
            .send(ApiRequest::put(format!("/api/users/{user_id}")).json(&update)?)
            .await?;
        self.auth().update_current_user(&profile)?;
        info!("profile updated");
        Ok(profile)
    }

    /// Change the signed-in user's password.
    ///
    /// # Errors
    ///
    /// `Validation` when the confirmation differs or the new password is out
    /// of range (nothing is sent), `AuthRequired` when signed out, otherwise
    /// the backend error.
    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        current: &str,
        new: &str,
        confirmation: &str,
    ) -> Result<()> {
        let user_id = self.auth().require_user()?;
        let request = ChangePasswordRequest::new(current, new, confirmation)?;
        self.api
            .send_empty(
                ApiRequest::post(format!("/api/users/{user_id}/change-password"))
                    .json(&request)?,
            )
            .await?;
        info!("password changed");
        Ok(())
    }
}
