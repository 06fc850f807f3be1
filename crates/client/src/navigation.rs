//! Application routes and the navigator that tracks the current location.

use core::fmt;

use tokio::sync::watch;
use tracing::debug;

/// A location the client can navigate to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Products,
    Cart,
    /// Login page, optionally returning to `return_url` afterwards.
    Login {
        return_url: Option<String>,
    },
    CheckoutAddress,
    CheckoutPayment,
    CheckoutConfirm,
    CheckoutSuccess,
    AccountOrders,
}

impl Route {
    /// Path including query string, e.g. `/login?returnUrl=%2Fcart`.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".to_string(),
            Self::Products => "/products".to_string(),
            Self::Cart => "/cart".to_string(),
            Self::Login { return_url: None } => "/login".to_string(),
            Self::Login {
                return_url: Some(url),
            } => format!("/login?returnUrl={}", urlencoding::encode(url)),
            Self::CheckoutAddress => "/checkout/address".to_string(),
            Self::CheckoutPayment => "/checkout/payment".to_string(),
            Self::CheckoutConfirm => "/checkout/confirm".to_string(),
            Self::CheckoutSuccess => "/checkout/success".to_string(),
            Self::AccountOrders => "/account/orders".to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Holds the current location and performs redirects.
///
/// Cloning shares the same location.
#[derive(Debug, Clone)]
pub struct Navigator {
    location: watch::Sender<String>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    /// A navigator starting at `/`.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at("/")
    }

    /// A navigator starting at an arbitrary path.
    #[must_use]
    pub fn starting_at(path: &str) -> Self {
        let (location, _) = watch::channel(path.to_string());
        Self { location }
    }

    /// Navigate to a route.
    pub fn navigate(&self, route: &Route) {
        let path = route.path();
        debug!(path = %path, "navigate");
        self.location.send_replace(path);
    }

    /// Record a location reached by other means (e.g. the user opened a page).
    pub fn visit(&self, path: &str) {
        self.location.send_replace(path.to_string());
    }

    /// The current path.
    #[must_use]
    pub fn current_path(&self) -> String {
        self.location.borrow().clone()
    }

    /// Observe location changes. The receiver starts with the current path.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.location.subscribe()
    }

    /// Redirect to the login page, preserving the current path as the return
    /// target. Returns that target.
    ///
    /// When already on the login page the existing return target is kept.
    pub fn redirect_to_login(&self) -> String {
        let current = self.current_path();
        let return_url = if is_login_path(&current) {
            return_url_of(&current).unwrap_or_else(|| "/".to_string())
        } else {
            current
        };
        self.navigate(&Route::Login {
            return_url: Some(return_url.clone()),
        });
        return_url
    }
}

fn is_login_path(path: &str) -> bool {
    path == "/login" || path.starts_with("/login?")
}

fn return_url_of(path: &str) -> Option<String> {
    let (_, query) = path.split_once('?')?;
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("returnUrl="))
        .and_then(|raw| urlencoding::decode(raw).ok())
        .map(std::borrow::Cow::into_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::Home.path(), "/");
        assert_eq!(Route::CheckoutPayment.path(), "/checkout/payment");
        assert_eq!(Route::AccountOrders.to_string(), "/account/orders");
        assert_eq!(
            Route::Login {
                return_url: Some("/products/1".to_string())
            }
            .path(),
            "/login?returnUrl=%2Fproducts%2F1"
        );
    }

    #[test]
    fn test_redirect_to_login_preserves_current_path() {
        let navigator = Navigator::starting_at("/products/12");
        let return_url = navigator.redirect_to_login();

        assert_eq!(return_url, "/products/12");
        assert_eq!(navigator.current_path(), "/login?returnUrl=%2Fproducts%2F12");
    }

    #[test]
    fn test_redirect_from_login_does_not_nest() {
        let navigator = Navigator::starting_at("/cart");
        navigator.redirect_to_login();
        let return_url = navigator.redirect_to_login();

        assert_eq!(return_url, "/cart");
        assert_eq!(navigator.current_path(), "/login?returnUrl=%2Fcart");
    }

    #[test]
    fn test_subscribers_see_latest_location() {
        let navigator = Navigator::new();
        navigator.navigate(&Route::CheckoutAddress);
        let rx = navigator.subscribe();
        assert_eq!(*rx.borrow(), "/checkout/address");
    }
}
