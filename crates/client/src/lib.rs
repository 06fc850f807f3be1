//! Bazaar marketplace client library.
//!
//! Everything a front end needs to talk to the marketplace backend: the
//! session store, the auth gate, one authenticated HTTP client, the cart
//! coordinator, the checkout flow and thin CRUD services. Front ends build a
//! [`Marketplace`] and render from its observable state.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod navigation;
pub mod services;
pub mod state;
pub mod storage;

pub use auth::AuthGate;
pub use cart::CartCoordinator;
pub use checkout::{CheckoutFlow, Entry, Step};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use navigation::{Navigator, Route};
pub use state::Marketplace;
pub use storage::SessionStore;
