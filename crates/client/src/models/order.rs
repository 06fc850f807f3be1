//! Orders and order placement.

use bazaar_core::{
    AddressId, OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus, Price, ProductId,
    UserId,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/orders/{userId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub shipping_address_id: AddressId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_address_id: Option<AddressId>,
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<String>,
}

/// An order as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub order_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub total_amount: Option<Price>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    /// Kept as text; older orders may carry methods this client does not offer.
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub shipping_address: Option<OrderAddress>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub has_coupon: Option<bool>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub user_first_name: Option<String>,
    #[serde(default)]
    pub user_last_name: Option<String>,
}

impl Order {
    /// Display number: the backend's order number, or the id when it has none.
    #[must_use]
    pub fn number(&self) -> String {
        self.order_number
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map_or_else(|| self.id.to_string(), str::to_string)
    }

    /// Whether the customer may still cancel.
    #[must_use]
    pub fn is_cancellable(&self) -> bool {
        self.status.is_some_and(OrderStatus::is_cancellable)
    }
}

/// Address snapshot stored with an order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAddress {
    #[serde(default)]
    pub recipient_name: Option<String>,
    #[serde(default)]
    pub address_line1: Option<String>,
    #[serde(default)]
    pub address_line2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(default)]
    pub id: Option<OrderItemId>,
    pub product_id: ProductId,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub product_name: String,
    #[serde(default)]
    pub product_image: Option<String>,
    pub quantity: u32,
    pub price: Price,
    #[serde(default)]
    pub subtotal: Option<Price>,
    #[serde(default)]
    pub seller_id: Option<UserId>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_omits_unset_fields() {
        let request = OrderRequest {
            shipping_address_id: AddressId::new(7),
            billing_address_id: None,
            payment_method: PaymentMethod::CashOnDelivery,
            coupon_code: None,
            payment_method_id: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"shippingAddressId": 7, "paymentMethod": "CASH_ON_DELIVERY"})
        );
    }

    #[test]
    fn test_number_falls_back_to_id() {
        let order: Order = serde_json::from_str(
            r#"{"id":42,"status":"PENDING","paymentStatus":"PENDING","items":[],"totalAmount":105.0}"#,
        )
        .unwrap();
        assert_eq!(order.number(), "42");
        assert!(order.is_cancellable());

        let numbered: Order =
            serde_json::from_str(r#"{"id":42,"orderNumber":"ORD-2024-0042"}"#).unwrap();
        assert_eq!(numbered.number(), "ORD-2024-0042");
        assert!(!numbered.is_cancellable());
    }

    #[test]
    fn test_deserializes_items() {
        let order: Order = serde_json::from_str(
            r#"{"id":1,"items":[{"id":5,"productId":3,"productName":"Lamp","quantity":2,"price":20.0,"subtotal":40.0,"sellerId":9}]}"#,
        )
        .unwrap();
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].seller_id, Some(UserId::new(9)));
    }
}
