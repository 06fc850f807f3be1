//! Catalog products and categories.

use bazaar_core::{CategoryId, Price, ProductId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// A product as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Units available; this is the stock ceiling for cart mutations.
    #[serde(default, alias = "stockQuantity", deserialize_with = "super::null_as_default")]
    pub stock_quantity: u32,
    #[serde(default)]
    pub category: Option<CategorySummary>,
    #[serde(default)]
    pub seller: Option<SellerSummary>,
}

impl Product {
    /// Whether any units are available.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock_quantity > 0
    }
}

/// Category reference embedded in a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub id: CategoryId,
    pub name: String,
}

/// Seller reference embedded in a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerSummary {
    pub id: UserId,
    pub username: String,
}

/// A catalog category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Body for creating or updating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub stock_quantity: u32,
    pub category_id: CategoryId,
    pub seller_id: UserId,
}

impl ProductRequest {
    /// Check the request before it is sent.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for a blank name or negative price.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.name.trim().is_empty() {
            return Err(ClientError::Validation(
                "Product name is required".to_string(),
            ));
        }
        if self.price.is_sign_negative() {
            return Err(ClientError::Validation(
                "Price cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserializes_backend_product() {
        let json = r#"{
            "id": 3,
            "name": "Desk lamp",
            "description": null,
            "price": 24.5,
            "image_url": "/img/lamp.png",
            "stock_quantity": 5,
            "category": {"id": 2, "name": "Home"},
            "seller": {"id": 9, "username": "lumen"}
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, ProductId::new(3));
        assert_eq!(product.stock_quantity, 5);
        assert_eq!(product.price.to_string(), "24.50");
        assert_eq!(product.seller.unwrap().username, "lumen");
    }

    #[test]
    fn test_missing_stock_is_zero() {
        let product: Product =
            serde_json::from_str(r#"{"id":1,"name":"x","price":1,"stock_quantity":null}"#)
                .unwrap();
        assert_eq!(product.stock_quantity, 0);
        assert!(!product.in_stock());
    }

    #[test]
    fn test_request_serializes_price_as_number() {
        let request = ProductRequest {
            name: "Mug".to_string(),
            description: None,
            price: Decimal::new(1250, 2),
            image_url: None,
            stock_quantity: 4,
            category_id: CategoryId::new(1),
            seller_id: UserId::new(2),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["price"], serde_json::json!(12.5));
        assert_eq!(value["category_id"], 1);
        assert!(value.get("description").is_none());
    }

    #[test]
    fn test_request_validation() {
        let mut request = ProductRequest {
            name: "  ".to_string(),
            description: None,
            price: Decimal::ONE,
            image_url: None,
            stock_quantity: 0,
            category_id: CategoryId::new(1),
            seller_id: UserId::new(2),
        };
        assert!(matches!(request.validate(), Err(ClientError::Validation(_))));

        request.name = "Mug".to_string();
        request.price = Decimal::NEGATIVE_ONE;
        assert!(request.validate().is_err());

        request.price = Decimal::ZERO;
        assert!(request.validate().is_ok());
    }
}
