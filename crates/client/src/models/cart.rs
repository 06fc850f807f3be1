//! The server-side shopping cart.

use bazaar_core::{CartId, CartItemId, Price, ProductId, UserId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Product;

/// A user's cart as returned by every cart endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    #[serde(default)]
    pub id: Option<CartId>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub total_price: Option<Price>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

/// One product line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(default)]
    pub id: Option<CartItemId>,
    pub product: CartProduct,
    pub quantity: u32,
    #[serde(default)]
    pub subtotal: Option<Price>,
}

impl CartItem {
    /// The backend's subtotal, or `price × quantity` when absent.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.subtotal
            .unwrap_or_else(|| self.product.price.times(self.quantity))
    }
}

/// The product fields embedded in a cart line.
///
/// Stock may be omitted by the cart endpoints; without it no client-side
/// ceiling can be enforced for that line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    #[serde(default, alias = "stockQuantity")]
    pub stock_quantity: Option<u32>,
    #[serde(default, alias = "imageUrl")]
    pub image_url: Option<String>,
}

impl From<&Product> for CartProduct {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            stock_quantity: Some(product.stock_quantity),
            image_url: product.image_url.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserializes_backend_cart() {
        let json = r#"{
            "id": 4,
            "userId": 1,
            "items": [
                {"id": 10, "product": {"id": 1, "name": "Lamp", "price": 20.0, "image_url": null},
                 "quantity": 3, "subtotal": 60.0},
                {"id": 11, "product": {"id": 2, "name": "Mug", "price": 5.5, "stockQuantity": 8},
                 "quantity": 2}
            ],
            "totalPrice": 71.0,
            "updatedAt": "2024-05-01T10:15:30"
        }"#;
        let cart: Cart = serde_json::from_str(json).unwrap();
        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.items[0].product.stock_quantity, None);
        assert_eq!(cart.items[1].product.stock_quantity, Some(8));
        assert_eq!(cart.items[1].line_total().to_string(), "11.00");
        assert!(cart.updated_at.is_some());
    }

    #[test]
    fn test_null_items_is_empty_cart() {
        let cart: Cart = serde_json::from_str(r#"{"userId":1,"items":null}"#).unwrap();
        assert!(cart.items.is_empty());
    }
}
