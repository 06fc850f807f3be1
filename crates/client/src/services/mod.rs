//! Thin CRUD collaborators over the backend REST API.
//!
//! Each service is a cheap `Clone` handle sharing one [`ApiClient`](crate::http::ApiClient).

pub mod account;
pub mod addresses;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod users;

pub use account::AccountService;
pub use addresses::AddressService;
pub use orders::OrderService;
pub use products::ProductService;
pub use reviews::ReviewService;
pub use users::UserAdminService;
