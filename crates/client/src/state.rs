//! The client container every front end holds.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::auth::AuthGate;
use crate::cart::CartCoordinator;
use crate::checkout::CheckoutFlow;
use crate::config::ClientConfig;
use crate::http::ApiClient;
use crate::navigation::Navigator;
use crate::services::{
    AccountService, AddressService, OrderService, ProductService, ReviewService, UserAdminService,
};
use crate::storage::SessionStore;

/// All client components, wired to one session store and one HTTP client.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Marketplace {
    inner: Arc<MarketplaceInner>,
}

struct MarketplaceInner {
    config: ClientConfig,
    auth: AuthGate,
    api: ApiClient,
    cart: CartCoordinator,
    products: ProductService,
    reviews: ReviewService,
    addresses: AddressService,
    orders: OrderService,
    account: AccountService,
    users: UserAdminService,
    checkout: CheckoutFlow,
}

impl Marketplace {
    /// Build the client. A user persisted in `store` is signed in again.
    #[must_use]
    pub fn new(config: ClientConfig, store: SessionStore, navigator: Navigator) -> Self {
        let auth = AuthGate::new(store, navigator);
        let api = ApiClient::new(&config, auth.clone());
        let cart = CartCoordinator::new(api.clone());
        let addresses = AddressService::new(api.clone());
        let orders = OrderService::new(api.clone());
        let checkout =
            CheckoutFlow::new(auth.clone(), cart.clone(), addresses.clone(), orders.clone());

        Self {
            inner: Arc::new(MarketplaceInner {
                products: ProductService::new(api.clone(), config.product_cache_ttl),
                reviews: ReviewService::new(api.clone()),
                account: AccountService::new(api.clone()),
                users: UserAdminService::new(api.clone()),
                config,
                auth,
                api,
                cart,
                addresses,
                orders,
                checkout,
            }),
        }
    }

    /// Keep the cart in step with sign-in and sign-out. Must be called from
    /// within a Tokio runtime; abort the handle to stop.
    #[must_use]
    pub fn start(&self) -> JoinHandle<()> {
        self.inner.cart.track_session()
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        self.inner.auth.store()
    }

    #[must_use]
    pub fn navigator(&self) -> &Navigator {
        self.inner.auth.navigator()
    }

    #[must_use]
    pub fn auth(&self) -> &AuthGate {
        &self.inner.auth
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn cart(&self) -> &CartCoordinator {
        &self.inner.cart
    }

    #[must_use]
    pub fn products(&self) -> &ProductService {
        &self.inner.products
    }

    #[must_use]
    pub fn reviews(&self) -> &ReviewService {
        &self.inner.reviews
    }

    #[must_use]
    pub fn addresses(&self) -> &AddressService {
        &self.inner.addresses
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    /// Sign-in, registration and the signed-in user's profile.
    #[must_use]
    pub fn account(&self) -> &AccountService {
        &self.inner.account
    }

    /// Admin user management.
    #[must_use]
    pub fn users(&self) -> &UserAdminService {
        &self.inner.users
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutFlow {
        &self.inner.checkout
    }
}
