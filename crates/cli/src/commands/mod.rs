//! Command implementations, one module per area.

pub mod account;
pub mod addresses;
pub mod admin;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod seller;

pub use account::ProfileAction;
pub use addresses::AddressAction;
pub use admin::AdminAction;
pub use cart::CartAction;
pub use catalog::{ProductAction, ReviewAction};
pub use checkout::CheckoutAction;
pub use orders::OrderAction;
pub use seller::SellerAction;
