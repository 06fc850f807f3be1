//! Users, sessions and account requests.

use bazaar_core::{UserId, UserRole};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ClientError;

const USERNAME_LENGTH: core::ops::RangeInclusive<usize> = 3..=20;
const PASSWORD_LENGTH: core::ops::RangeInclusive<usize> = 6..=40;

/// Accept `USER`, `ROLE_USER`, `customer` and friends; unknown or missing
/// roles are treated as a plain customer.
fn lenient_role<'de, D>(deserializer: D) -> Result<UserRole, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|r| r.parse().ok()).unwrap_or_default())
}

// =============================================================================
// Session
// =============================================================================

/// The signed-in user record, as returned by login/register and persisted
/// under `currentUser`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(rename = "type", default = "default_token_type")]
    pub token_type: String,
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(default, deserialize_with = "lenient_role")]
    pub role: UserRole,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl std::fmt::Debug for SessionUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionUser")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// In-memory view of the signed-in user. The bearer token never leaves a
/// [`SecretString`] except when sent or persisted.
#[derive(Clone)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    token: Option<SecretString>,
    token_type: String,
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl CurrentUser {
    /// The bearer token, if the backend issued one.
    #[must_use]
    pub const fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    /// Full name when known, otherwise the username.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if full.is_empty() {
            self.username.clone()
        } else {
            full
        }
    }

    /// Record suitable for persisting under `currentUser`.
    #[must_use]
    pub fn to_session(&self) -> SessionUser {
        SessionUser {
            token: self.token.as_ref().map(|t| t.expose_secret().to_string()),
            token_type: self.token_type.clone(),
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }

    /// Apply profile changes made elsewhere, keeping the credential.
    pub fn apply_profile(&mut self, profile: &UserProfile) {
        self.username.clone_from(&profile.username);
        self.email.clone_from(&profile.email);
        self.first_name.clone_from(&profile.first_name);
        self.last_name.clone_from(&profile.last_name);
        self.role = profile.role;
    }
}

impl From<SessionUser> for CurrentUser {
    fn from(user: SessionUser) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            first_name: user.first_name,
            last_name: user.last_name,
            token: user
                .token
                .filter(|t| !t.is_empty())
                .map(SecretString::from),
            token_type: user.token_type,
        }
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /api/users/login`.
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

impl std::fmt::Debug for LoginRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Body of `POST /api/users/register`.
#[derive(Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl RegisterRequest {
    /// Check required fields and lengths, normalizing the email in place.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` or `ClientError::InvalidEmail`.
    pub fn validate(&mut self) -> Result<(), ClientError> {
        self.username = self.username.trim().to_string();
        if self.username.is_empty() {
            return Err(ClientError::Validation("Username is required".to_string()));
        }
        if !USERNAME_LENGTH.contains(&self.username.chars().count()) {
            return Err(ClientError::Validation(format!(
                "Username must be {}-{} characters",
                USERNAME_LENGTH.start(),
                USERNAME_LENGTH.end()
            )));
        }
        self.email = bazaar_core::Email::parse(&self.email)?.to_string();
        validate_password(&self.password)?;
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        Ok(())
    }
}

/// Check a new password's length.
///
/// # Errors
///
/// Returns `ClientError::Validation` when it is blank or outside 6-40 characters.
pub fn validate_password(password: &str) -> Result<(), ClientError> {
    if password.is_empty() {
        return Err(ClientError::Validation("Password is required".to_string()));
    }
    if !PASSWORD_LENGTH.contains(&password.chars().count()) {
        return Err(ClientError::Validation(format!(
            "Password must be {}-{} characters",
            PASSWORD_LENGTH.start(),
            PASSWORD_LENGTH.end()
        )));
    }
    Ok(())
}

/// Body of `PUT /api/users/{id}`.
#[derive(Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

impl std::fmt::Debug for UserUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserUpdate")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl From<&UserProfile> for UserUpdate {
    fn from(profile: &UserProfile) -> Self {
        Self {
            username: profile.username.clone(),
            email: profile.email.clone(),
            password: None,
            first_name: profile.first_name.clone().unwrap_or_default(),
            last_name: profile.last_name.clone().unwrap_or_default(),
            role: profile.role,
        }
    }
}

/// Body of `POST /api/users/{id}/change-password`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest<'a> {
    pub current_password: &'a str,
    pub new_password: &'a str,
}

impl<'a> ChangePasswordRequest<'a> {
    /// Build a request after checking the confirmation and the new password.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` when the confirmation differs or the
    /// new password is too short or too long.
    pub fn new(
        current_password: &'a str,
        new_password: &'a str,
        confirmation: &str,
    ) -> Result<Self, ClientError> {
        if current_password.is_empty() {
            return Err(ClientError::Validation(
                "Current password is required".to_string(),
            ));
        }
        if new_password != confirmation {
            return Err(ClientError::Validation(
                "New passwords do not match".to_string(),
            ));
        }
        validate_password(new_password)?;
        Ok(Self {
            current_password,
            new_password,
        })
    }
}

impl std::fmt::Debug for ChangePasswordRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ChangePasswordRequest { .. }")
    }
}

// =============================================================================
// Profiles
// =============================================================================

/// A user account as seen by its owner or an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_role")]
    pub role: UserRole,
    #[serde(default)]
    pub banned: Option<bool>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const LOGIN_RESPONSE: &str = r#"{
        "token": "eyJhbGciOiJIUzI1NiJ9.payload.sig",
        "type": "Bearer",
        "id": 5,
        "username": "jane",
        "email": "jane@example.com",
        "role": "SELLER",
        "firstName": "Jane",
        "lastName": "Doe"
    }"#;

    #[test]
    fn test_session_round_trip_keeps_token() {
        let session: SessionUser = serde_json::from_str(LOGIN_RESPONSE).unwrap();
        let user = CurrentUser::from(session.clone());
        assert_eq!(user.role, UserRole::Seller);
        assert_eq!(
            user.token().unwrap().expose_secret(),
            "eyJhbGciOiJIUzI1NiJ9.payload.sig"
        );
        assert_eq!(user.to_session(), session);
    }

    #[test]
    fn test_debug_redacts_token() {
        let session: SessionUser = serde_json::from_str(LOGIN_RESPONSE).unwrap();
        let user = CurrentUser::from(session.clone());
        assert!(!format!("{user:?}").contains("payload"));
        assert!(!format!("{session:?}").contains("payload"));
    }

    #[test]
    fn test_lenient_role() {
        let session: SessionUser = serde_json::from_str(
            r#"{"id":1,"username":"a","email":"a@b.co","role":"ROLE_ADMIN"}"#,
        )
        .unwrap();
        assert_eq!(session.role, UserRole::Admin);
        assert_eq!(session.token_type, "Bearer");

        let unknown: UserProfile =
            serde_json::from_str(r#"{"id":1,"username":"a","email":"a@b.co","role":"ROOT"}"#)
                .unwrap();
        assert_eq!(unknown.role, UserRole::User);
    }

    #[test]
    fn test_register_validation() {
        let mut request = RegisterRequest {
            username: " jdoe ".to_string(),
            email: " jd@example.com ".to_string(),
            password: "secret1".to_string(),
            ..RegisterRequest::default()
        };
        request.validate().unwrap();
        assert_eq!(request.username, "jdoe");
        assert_eq!(request.email, "jd@example.com");
        assert_eq!(request.role, UserRole::User);

        let mut short_password = RegisterRequest {
            username: "jdoe".to_string(),
            email: "jd@example.com".to_string(),
            password: "12345".to_string(),
            ..RegisterRequest::default()
        };
        assert!(matches!(
            short_password.validate(),
            Err(ClientError::Validation(_))
        ));

        let mut bad_email = RegisterRequest {
            username: "jdoe".to_string(),
            email: "jd".to_string(),
            password: "secret1".to_string(),
            ..RegisterRequest::default()
        };
        assert!(matches!(
            bad_email.validate(),
            Err(ClientError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_change_password_checks_confirmation() {
        assert!(ChangePasswordRequest::new("old", "newpass", "newpas").is_err());
        assert!(ChangePasswordRequest::new("old", "abc", "abc").is_err());
        assert!(ChangePasswordRequest::new("", "newpass", "newpass").is_err());

        let request = ChangePasswordRequest::new("old", "newpass", "newpass").unwrap();
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["currentPassword"], "old");
        assert_eq!(value["newPassword"], "newpass");
    }
}
