//! The cart coordinator: the single authoritative copy of the user's cart.
//!
//! Every mutation is validated against the product's stock ceiling before a
//! request is sent, and local state is only ever replaced with what the
//! server returns. There are no optimistic updates; overlapping mutations
//! are not serialized, so the last response to arrive wins.

use std::sync::Arc;

use bazaar_core::{Price, ProductId, UserId};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::auth::AuthGate;
use crate::error::{ClientError, Result};
use crate::http::{ApiClient, ApiRequest};
use crate::models::{Cart, CartItem, Product};

/// Observable, server-backed cart state.
#[derive(Clone)]
pub struct CartCoordinator {
    inner: Arc<CartCoordinatorInner>,
}

struct CartCoordinatorInner {
    api: ApiClient,
    items: watch::Sender<Vec<CartItem>>,
    loading: watch::Sender<bool>,
}

/// Raises the loading flag for its lifetime.
struct LoadingGuard<'a>(&'a watch::Sender<bool>);

impl<'a> LoadingGuard<'a> {
    fn raise(flag: &'a watch::Sender<bool>) -> Self {
        flag.send_replace(true);
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}

impl CartCoordinator {
    /// Create an empty coordinator. Call [`load`](Self::load) or
    /// [`track_session`](Self::track_session) to populate it.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        let (items, _) = watch::channel(Vec::new());
        let (loading, _) = watch::channel(false);
        Self {
            inner: Arc::new(CartCoordinatorInner {
                api,
                items,
                loading,
            }),
        }
    }

    fn auth(&self) -> &AuthGate {
        self.inner.api.auth()
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Snapshot of the current items.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.inner.items.borrow().clone()
    }

    /// Observe the items. New receivers start with the latest value.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<CartItem>> {
        self.inner.items.subscribe()
    }

    /// Observe the loading flag.
    #[must_use]
    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.inner.loading.subscribe()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        *self.inner.loading.borrow()
    }

    /// Sum of line totals (backend subtotal when given, else price × quantity).
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.inner.items.borrow().iter().map(CartItem::line_total).sum()
    }

    /// Total number of units.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.inner.items.borrow().iter().map(|i| i.quantity).sum()
    }

    /// Units of `product_id` currently in the cart.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.inner
            .items
            .borrow()
            .iter()
            .find(|i| i.product.id == product_id)
            .map_or(0, |i| i.quantity)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.items.borrow().is_empty()
    }

    fn replace(&self, cart: Cart) {
        debug!(items = cart.items.len(), "cart replaced from server");
        self.inner.items.send_replace(cart.items);
    }

    /// Drop local state without contacting the server.
    pub fn reset(&self) {
        self.inner.items.send_replace(Vec::new());
    }

    // =========================================================================
    // Server operations
    // =========================================================================

    /// Fetch the signed-in user's cart. Does nothing when signed out.
    ///
    /// # Errors
    ///
    /// On failure the local cart is emptied and the error returned.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<()> {
        let Some(user_id) = self.auth().current_user_id() else {
            debug!("not signed in, skipping cart load");
            return Ok(());
        };
        let _loading = LoadingGuard::raise(&self.inner.loading);
        match self.fetch(user_id).await {
            Ok(cart) => {
                self.replace(cart);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "failed to load cart");
                self.reset();
                Err(e)
            }
        }
    }

    async fn fetch(&self, user_id: UserId) -> Result<Cart> {
        self.inner
            .api
            .send(ApiRequest::get(format!("/api/cart/{user_id}")).session())
            .await
    }

    /// Add `quantity` units of `product`.
    ///
    /// # Errors
    ///
    /// - `ClientError::AuthRequired` when signed out (after redirecting to login)
    /// - `ClientError::Validation` for a zero quantity
    /// - `ClientError::StockExceeded` when the cart would exceed the stock
    ///
    /// None of these send a request or change the cart. Backend failures are
    /// returned unchanged.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add(&self, product: &Product, quantity: u32) -> Result<()> {
        let user_id = self.auth().require_user()?;
        if quantity == 0 {
            return Err(ClientError::Validation(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let in_cart = self.quantity_of(product.id);
        if in_cart.saturating_add(quantity) > product.stock_quantity {
            let remaining = product.stock_quantity.saturating_sub(in_cart);
            let message = if in_cart == 0 {
                format!(
                    "Only {} of {} in stock",
                    product.stock_quantity, product.name
                )
            } else {
                format!(
                    "Only {} of {} in stock and {} already in your cart. You can add {} more",
                    product.stock_quantity, product.name, in_cart, remaining
                )
            };
            return Err(ClientError::StockExceeded {
                message,
                available: product.stock_quantity,
                in_cart,
            });
        }

        let _loading = LoadingGuard::raise(&self.inner.loading);
        let cart: Cart = self
            .inner
            .api
            .send(
                ApiRequest::post(format!("/api/cart/{user_id}/product/{}", product.id))
                    .query("quantity", quantity)
                    .session(),
            )
            .await?;
        info!(quantity, "added to cart");
        self.replace(cart);
        Ok(())
    }

    /// Set the quantity of a product already in the cart. A quantity of zero
    /// or less removes it.
    ///
    /// # Errors
    ///
    /// `ClientError::StockExceeded` when the item's known stock is lower than
    /// `quantity`; no request is sent. On a backend failure the server cart is
    /// re-fetched before the error is returned.
    #[instrument(skip(self))]
    pub async fn update_quantity(&self, product_id: ProductId, quantity: i64) -> Result<()> {
        if quantity <= 0 {
            return self.remove(product_id).await;
        }
        let user_id = self.auth().require_user()?;
        let quantity = u32::try_from(quantity)
            .map_err(|_| ClientError::Validation("Quantity is too large".to_string()))?;

        let ceiling = self
            .inner
            .items
            .borrow()
            .iter()
            .find(|i| i.product.id == product_id)
            .and_then(|i| i.product.stock_quantity.map(|s| (s, i.product.name.clone(), i.quantity)));
        if let Some((stock, name, in_cart)) = ceiling
            && quantity > stock
        {
            return Err(ClientError::StockExceeded {
                message: format!("Only {stock} of {name} in stock"),
                available: stock,
                in_cart,
            });
        }

        let result = {
            let _loading = LoadingGuard::raise(&self.inner.loading);
            self.inner
                .api
                .send::<Cart>(
                    ApiRequest::put(format!("/api/cart/{user_id}/product/{product_id}"))
                        .query("quantity", quantity)
                        .session(),
                )
                .await
        };

        match result {
            Ok(cart) => {
                self.replace(cart);
                Ok(())
            }
            Err(e @ ClientError::AuthRequired { .. }) => Err(e),
            Err(e) => {
                warn!(error = %e, "quantity update failed, resyncing cart");
                if let Err(reload) = self.load().await {
                    warn!(error = %reload, "cart resync failed");
                }
                Err(e)
            }
        }
    }

    /// Remove a product from the cart.
    ///
    /// # Errors
    ///
    /// `ClientError::AuthRequired` when signed out, or the backend error.
    #[instrument(skip(self))]
    pub async fn remove(&self, product_id: ProductId) -> Result<()> {
        let user_id = self.auth().require_user()?;
        let _loading = LoadingGuard::raise(&self.inner.loading);
        let cart: Cart = self
            .inner
            .api
            .send(
                ApiRequest::delete(format!("/api/cart/{user_id}/product/{product_id}")).session(),
            )
            .await?;
        self.replace(cart);
        Ok(())
    }

    /// Empty the cart on the server and locally.
    ///
    /// # Errors
    ///
    /// `ClientError::AuthRequired` when signed out, or the backend error (the
    /// local cart is left as it was).
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        let user_id = self.auth().require_user()?;
        let _loading = LoadingGuard::raise(&self.inner.loading);
        self.inner
            .api
            .send_empty(ApiRequest::delete(format!("/api/cart/{user_id}/clear")).session())
            .await?;
        self.reset();
        Ok(())
    }

    /// Follow the auth gate: load the cart on sign-in, drop it on sign-out.
    ///
    /// The task runs until aborted.
    #[must_use]
    pub fn track_session(&self) -> JoinHandle<()> {
        let coordinator = self.clone();
        let mut sessions = self.auth().subscribe();
        tokio::spawn(async move {
            loop {
                let signed_in = sessions.borrow_and_update().is_some();
                if signed_in {
                    if let Err(e) = coordinator.load().await {
                        warn!(error = %e, "cart load after sign-in failed");
                    }
                } else {
                    coordinator.reset();
                }
                if sessions.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::models::CartProduct;
    use crate::navigation::Navigator;
    use crate::storage::SessionStore;
    use url::Url;

    fn coordinator() -> CartCoordinator {
        // Port 9 (discard) is never contacted by these tests.
        let config = ClientConfig::new(Url::parse("http://127.0.0.1:9").unwrap());
        let auth = AuthGate::new(SessionStore::in_memory(), Navigator::starting_at("/products"));
        CartCoordinator::new(ApiClient::new(&config, auth))
    }

    fn item(id: i64, price_cents: i64, quantity: u32, subtotal: Option<i64>) -> CartItem {
        CartItem {
            id: None,
            product: CartProduct {
                id: ProductId::new(id),
                name: format!("Product {id}"),
                price: Price::from_cents(price_cents),
                stock_quantity: Some(10),
                image_url: None,
            },
            quantity,
            subtotal: subtotal.map(Price::from_cents),
        }
    }

    fn product(stock: u32) -> Product {
        Product {
            id: ProductId::new(1),
            name: "Lamp".to_string(),
            description: None,
            price: Price::from_cents(2000),
            image_url: None,
            stock_quantity: stock,
            category: None,
            seller: None,
        }
    }

    #[test]
    fn test_aggregates() {
        let cart = coordinator();
        cart.replace(Cart {
            items: vec![item(1, 1000, 2, None), item(2, 250, 3, Some(700))],
            ..Cart::default()
        });

        assert_eq!(cart.total_items(), 5);
        // 2 × 10.00 + backend subtotal 7.00
        assert_eq!(cart.total_price(), Price::from_cents(2700));
        assert_eq!(cart.quantity_of(ProductId::new(2)), 3);
        assert_eq!(cart.quantity_of(ProductId::new(9)), 0);
    }

    #[test]
    fn test_subscribers_replay_latest_items() {
        let cart = coordinator();
        cart.replace(Cart {
            items: vec![item(1, 100, 1, None)],
            ..Cart::default()
        });
        let rx = cart.subscribe();
        assert_eq!(rx.borrow().len(), 1);

        cart.reset();
        assert!(cart.is_empty());
        assert!(rx.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_add_requires_login() {
        let cart = coordinator();
        let err = cart.add(&product(5), 1).await.unwrap_err();

        assert!(matches!(err, ClientError::AuthRequired { ref return_url } if return_url == "/products"));
        assert!(cart.is_empty());
        assert!(!cart.is_loading());
    }

    #[tokio::test]
    async fn test_load_is_noop_when_signed_out() {
        let cart = coordinator();
        cart.load().await.unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_loading_guard_lowers_flag() {
        let cart = coordinator();
        {
            let _guard = LoadingGuard::raise(&cart.inner.loading);
            assert!(cart.is_loading());
        }
        assert!(!cart.is_loading());
    }
}
