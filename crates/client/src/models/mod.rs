//! Wire types exchanged with the marketplace backend.
//!
//! Product payloads use `snake_case` keys, everything else `camelCase`,
//! matching what the backend emits.

pub mod address;
pub mod cart;
pub mod order;
pub mod product;
pub mod review;
pub mod user;

pub use address::Address;
pub use cart::{Cart, CartItem, CartProduct};
pub use order::{Order, OrderAddress, OrderItem, OrderRequest};
pub use product::{Category, CategorySummary, Product, ProductRequest, SellerSummary};
pub use review::{Review, ReviewAuthor, ReviewRequest};
pub use user::{
    ChangePasswordRequest, CurrentUser, LoginRequest, RegisterRequest, SessionUser, UserProfile,
    UserUpdate,
};

use serde::{Deserialize, Deserializer};

/// Deserialize `null` as the type's default (the backend sends `null` for
/// empty collections and unset flags).
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
