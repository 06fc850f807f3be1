//! Login state, role checks and the bearer credential.
//!
//! The gate restores the persisted `currentUser` at construction and
//! publishes changes through a watch channel, so late subscribers (such as
//! the cart coordinator) immediately see who is signed in.

use std::sync::Arc;

use bazaar_core::{UserId, UserRole};
use secrecy::SecretString;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::{ClientError, Result};
use crate::models::{CurrentUser, SessionUser, UserProfile};
use crate::navigation::{Navigator, Route};
use crate::storage::{SessionStore, keys};

/// Holds the signed-in user.
#[derive(Clone)]
pub struct AuthGate {
    inner: Arc<AuthGateInner>,
}

struct AuthGateInner {
    store: SessionStore,
    navigator: Navigator,
    current: watch::Sender<Option<CurrentUser>>,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("current", &*self.inner.current.borrow())
            .finish_non_exhaustive()
    }
}

impl AuthGate {
    /// Create a gate, restoring any persisted user.
    ///
    /// A malformed stored record is discarded and treated as signed out.
    #[must_use]
    pub fn new(store: SessionStore, navigator: Navigator) -> Self {
        let restored = match SessionStore::get_json::<SessionUser>(
            store.local(),
            keys::CURRENT_USER,
        ) {
            Ok(user) => user.map(CurrentUser::from),
            Err(e) => {
                warn!(error = %e, "could not read stored user, starting signed out");
                None
            }
        };
        let (current, _) = watch::channel(restored);
        Self {
            inner: Arc::new(AuthGateInner {
                store,
                navigator,
                current,
            }),
        }
    }

    /// The session store this gate persists into.
    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.inner.store
    }

    /// The navigator used for login redirects.
    #[must_use]
    pub fn navigator(&self) -> &Navigator {
        &self.inner.navigator
    }

    /// Observe sign-in changes. New receivers see the current user.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<CurrentUser>> {
        self.inner.current.subscribe()
    }

    /// Snapshot of the signed-in user.
    #[must_use]
    pub fn current_user(&self) -> Option<CurrentUser> {
        self.inner.current.borrow().clone()
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.inner.current.borrow().is_some()
    }

    #[must_use]
    pub fn current_user_id(&self) -> Option<UserId> {
        self.inner.current.borrow().as_ref().map(|u| u.id)
    }

    #[must_use]
    pub fn role(&self) -> Option<UserRole> {
        self.inner.current.borrow().as_ref().map(|u| u.role)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role() == Some(UserRole::Admin)
    }

    /// Sellers and administrators may both manage products.
    #[must_use]
    pub fn is_seller(&self) -> bool {
        self.role().is_some_and(UserRole::is_seller_or_admin)
    }

    /// The bearer credential, if any.
    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        self.inner
            .current
            .borrow()
            .as_ref()
            .and_then(|u| u.token().cloned())
    }

    /// Persist and publish a freshly authenticated user.
    ///
    /// # Errors
    ///
    /// Returns an error if the local store cannot be written.
    pub fn sign_in(&self, session: SessionUser) -> Result<CurrentUser> {
        if session.token.as_deref().is_none_or(str::is_empty) {
            warn!(user_id = %session.id, "backend issued no token for session");
        }
        SessionStore::set_json(self.inner.store.local(), keys::CURRENT_USER, &session)?;
        let user = CurrentUser::from(session);
        info!(user_id = %user.id, role = %user.role, "signed in");
        self.inner.current.send_replace(Some(user.clone()));
        Ok(user)
    }

    /// Apply updated profile fields to the signed-in user, keeping the token.
    ///
    /// Does nothing when nobody is signed in or the profile belongs to
    /// someone else.
    ///
    /// # Errors
    ///
    /// Returns an error if the local store cannot be written.
    pub fn update_current_user(&self, profile: &UserProfile) -> Result<()> {
        let Some(mut user) = self.current_user() else {
            return Ok(());
        };
        if user.id != profile.id {
            return Ok(());
        }
        user.apply_profile(profile);
        SessionStore::set_json(
            self.inner.store.local(),
            keys::CURRENT_USER,
            &user.to_session(),
        )?;
        self.inner.current.send_replace(Some(user));
        Ok(())
    }

    /// Forget the user and every session-scoped key, then publish `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the stores cannot be written. The in-memory state
    /// is cleared regardless.
    pub fn logout(&self) -> Result<()> {
        let previous = self.inner.current.send_replace(None);
        if let Some(user) = previous {
            info!(user_id = %user.id, "signed out");
        }
        self.inner.store.local().remove(keys::CURRENT_USER)?;
        self.inner.store.clear_session()?;
        Ok(())
    }

    /// The signed-in user's id, or a redirect to login.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AuthRequired` after navigating to
    /// `/login?returnUrl=<current path>` when nobody is signed in.
    pub fn require_user(&self) -> Result<UserId> {
        self.current_user_id().ok_or_else(|| ClientError::AuthRequired {
            return_url: self.inner.navigator.redirect_to_login(),
        })
    }

    /// Like [`require_user`](Self::require_user), additionally requiring a role.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AuthRequired` when signed out, or
    /// `ClientError::Forbidden` (after navigating home) when the role is
    /// insufficient.
    pub fn require_role(&self, allowed: impl Fn(UserRole) -> bool) -> Result<UserId> {
        let user_id = self.require_user()?;
        match self.role() {
            Some(role) if allowed(role) => Ok(user_id),
            role => {
                warn!(user_id = %user_id, ?role, "role check failed");
                self.inner.navigator.navigate(&Route::Home);
                Err(ClientError::Forbidden(
                    "You do not have permission to view this page".to_string(),
                ))
            }
        }
    }

    /// The backend rejected our credential: sign out, send the user to login
    /// and produce the error to return.
    pub(crate) fn expire_session(&self) -> ClientError {
        warn!("session rejected by backend, signing out");
        if let Err(e) = self.logout() {
            warn!(error = %e, "failed to clear stored session");
        }
        ClientError::AuthRequired {
            return_url: self.inner.navigator.redirect_to_login(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn session(role: UserRole) -> SessionUser {
        SessionUser {
            token: Some("tok".to_string()),
            token_type: "Bearer".to_string(),
            id: UserId::new(5),
            username: "jane".to_string(),
            email: "jane@example.com".to_string(),
            role,
            first_name: None,
            last_name: None,
        }
    }

    #[test]
    fn test_restores_persisted_user() {
        let store = SessionStore::in_memory();
        SessionStore::set_json(store.local(), keys::CURRENT_USER, &session(UserRole::Admin))
            .unwrap();

        let gate = AuthGate::new(store, Navigator::new());
        assert!(gate.is_logged_in());
        assert!(gate.is_admin());
        assert!(gate.is_seller());
        assert_eq!(gate.token().unwrap().expose_secret(), "tok");
    }

    #[test]
    fn test_malformed_user_is_discarded() {
        let store = SessionStore::in_memory();
        store.local().set(keys::CURRENT_USER, "{\"id\":").unwrap();

        let gate = AuthGate::new(store.clone(), Navigator::new());
        assert!(!gate.is_logged_in());
        assert_eq!(store.local().get(keys::CURRENT_USER).unwrap(), None);
    }

    #[test]
    fn test_logout_clears_session_keys() {
        let store = SessionStore::in_memory();
        let gate = AuthGate::new(store.clone(), Navigator::new());
        gate.sign_in(session(UserRole::User)).unwrap();
        store.set(keys::SHIPPING_ADDRESS_ID, "7").unwrap();
        store.set(keys::ORDER_ID, "1").unwrap();

        let rx = gate.subscribe();
        gate.logout().unwrap();

        assert!(rx.borrow().is_none());
        assert_eq!(store.local().get(keys::CURRENT_USER).unwrap(), None);
        assert_eq!(store.get(keys::SHIPPING_ADDRESS_ID).unwrap(), None);
        assert_eq!(store.get(keys::ORDER_ID).unwrap(), None);
    }

    #[test]
    fn test_require_user_redirects_with_return_url() {
        let navigator = Navigator::starting_at("/products/3");
        let gate = AuthGate::new(SessionStore::in_memory(), navigator.clone());

        let err = gate.require_user().unwrap_err();
        assert!(matches!(err, ClientError::AuthRequired { ref return_url } if return_url == "/products/3"));
        assert_eq!(navigator.current_path(), "/login?returnUrl=%2Fproducts%2F3");
    }

    #[test]
    fn test_seller_role_checks() {
        let gate = AuthGate::new(SessionStore::in_memory(), Navigator::new());
        gate.sign_in(session(UserRole::Seller)).unwrap();
        assert!(gate.is_seller());
        assert!(!gate.is_admin());
        assert!(gate.require_role(UserRole::is_seller_or_admin).is_ok());
        assert!(matches!(
            gate.require_role(|r| r == UserRole::Admin),
            Err(ClientError::Forbidden(_))
        ));
        assert_eq!(gate.navigator().current_path(), "/");
    }

    #[test]
    fn test_update_current_user_keeps_token() {
        let gate = AuthGate::new(SessionStore::in_memory(), Navigator::new());
        gate.sign_in(session(UserRole::User)).unwrap();

        let profile = UserProfile {
            id: UserId::new(5),
            username: "jane.d".to_string(),
            email: "jane@example.com".to_string(),
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
            role: UserRole::User,
            banned: None,
        };
        gate.update_current_user(&profile).unwrap();

        let user = gate.current_user().unwrap();
        assert_eq!(user.display_name(), "Jane Doe");
        assert_eq!(gate.token().unwrap().expose_secret(), "tok");
    }
}
