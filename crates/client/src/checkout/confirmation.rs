//! Step 3: review everything and place the order.

use std::sync::atomic::{AtomicBool, Ordering};

use bazaar_core::{AddressId, PaymentMethod, Price};
use tracing::{info, instrument, warn};

use super::{CheckoutFlow, CheckoutSelection, Step};
use crate::error::{ClientError, Result};
use crate::models::{Address, CartItem, Order, OrderRequest};
use crate::storage::keys;

/// Flat fee charged for cash on delivery, in cents.
pub const COD_SURCHARGE_CENTS: i64 = 500;

/// Shipping fee for `method`.
fn shipping_fee(method: PaymentMethod) -> Price {
    match method {
        PaymentMethod::CashOnDelivery => Price::from_cents(COD_SURCHARGE_CENTS),
        PaymentMethod::CreditCard | PaymentMethod::BankTransfer => Price::ZERO,
    }
}

/// The confirmation step, with addresses and cart resolved.
pub struct ConfirmationStep {
    flow: CheckoutFlow,
    selection: CheckoutSelection,
    method: PaymentMethod,
    shipping: Option<Address>,
    billing: Option<Address>,
    error: Option<String>,
    placed: AtomicBool,
}

impl std::fmt::Debug for ConfirmationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationStep")
            .field("method", &self.method)
            .field("shipping", &self.shipping.as_ref().and_then(|a| a.id))
            .field("billing", &self.billing.as_ref().and_then(|a| a.id))
            .field("error", &self.error)
            .field("placed", &self.placed)
            .finish_non_exhaustive()
    }
}

impl ConfirmationStep {
    /// Fetch the shipping address, the billing address (when one was chosen)
    /// and the cart at the same time.
    pub(super) async fn load(flow: CheckoutFlow, selection: CheckoutSelection) -> Result<Self> {
        let method = selection.payment_method.ok_or_else(|| {
            ClientError::MissingSelection("Please choose a payment method".to_string())
        })?;

        let billing_id = selection
            .billing_address_id
            .filter(|id| Some(*id) != selection.shipping_address_id);
        let (shipping, billing, cart) = tokio::join!(
            Self::fetch_address(&flow, selection.shipping_address_id),
            Self::fetch_address(&flow, billing_id),
            flow.cart().load(),
        );

        for result in [shipping.as_ref().err(), billing.as_ref().err(), cart.as_ref().err()] {
            if let Some(ClientError::AuthRequired { return_url }) = result {
                return Err(ClientError::AuthRequired {
                    return_url: return_url.clone(),
                });
            }
        }

        let mut error = None;
        let shipping = match shipping {
            Ok(address) => address,
            Err(e) => {
                warn!(error = %e, "failed to load shipping address");
                error = Some(format!("Failed to load addresses: {}", e.user_message()));
                None
            }
        };
        let billing = match billing {
            // Same as shipping.
            Ok(None) if selection.billing_address_id.is_some() => shipping.clone(),
            Ok(address) => address,
            Err(e) => {
                warn!(error = %e, "failed to load billing address");
                error.get_or_insert_with(|| {
                    format!("Failed to load addresses: {}", e.user_message())
                });
                None
            }
        };
        if let Err(e) = cart {
            error.get_or_insert_with(|| format!("Failed to load cart: {}", e.user_message()));
        }

        Ok(Self {
            flow,
            selection,
            method,
            shipping,
            billing,
            error,
            placed: AtomicBool::new(false),
        })
    }

    async fn fetch_address(flow: &CheckoutFlow, id: Option<AddressId>) -> Result<Option<Address>> {
        match id {
            Some(id) => flow.addresses().get(id).await.map(Some),
            None => Ok(None),
        }
    }

    #[must_use]
    pub const fn method(&self) -> PaymentMethod {
        self.method
    }

    /// Human-readable payment method.
    #[must_use]
    pub const fn method_label(&self) -> &'static str {
        self.method.label()
    }

    /// `**** **** **** 1234` for card payments.
    #[must_use]
    pub fn masked_card(&self) -> Option<String> {
        self.selection
            .card_data
            .as_ref()
            .filter(|_| self.method.requires_card())
            .map(super::CardData::masked_number)
    }

    #[must_use]
    pub const fn shipping_address(&self) -> Option<&Address> {
        self.shipping.as_ref()
    }

    #[must_use]
    pub const fn billing_address(&self) -> Option<&Address> {
        self.billing.as_ref()
    }

    /// Problem encountered while loading, for display.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Current cart lines.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.flow.cart().items()
    }

    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.flow.cart().total_price()
    }

    #[must_use]
    pub fn shipping_fee(&self) -> Price {
        shipping_fee(self.method)
    }

    #[must_use]
    pub fn total(&self) -> Price {
        self.subtotal() + self.shipping_fee()
    }

    /// Submit the order.
    ///
    /// On success the order id and number replace the checkout keys in the
    /// session store, the cart is cleared and the navigator moves to the
    /// success page. Once the order exists, storage and cart failures are only
    /// logged. A step places at most one order.
    ///
    /// # Errors
    ///
    /// - `ClientError::MissingSelection` when the shipping address could not be
    ///   resolved, or this step already placed its order
    /// - `ClientError::OrderInFlight` while another submission is pending
    ///
    /// Backend failures are returned with nothing stored, so the call can be
    /// retried.
    #[instrument(skip(self), fields(method = %self.method))]
    pub async fn place_order(&self) -> Result<Order> {
        let shipping = self
            .shipping
            .as_ref()
            .and_then(|a| a.id)
            .ok_or_else(|| {
                ClientError::MissingSelection("Shipping address is required".to_string())
            })?;
        let _placing = self.flow.begin_order()?;
        // Set only while the guard is held.
        if self.placed.load(Ordering::Acquire) {
            return Err(ClientError::MissingSelection(
                "This order has already been placed".to_string(),
            ));
        }

        let request = OrderRequest {
            shipping_address_id: shipping,
            billing_address_id: self.billing.as_ref().and_then(|a| a.id),
            payment_method: self.method,
            coupon_code: None,
            payment_method_id: None,
        };
        let order = self.flow.orders().create(&request).await?;
        self.placed.store(true, Ordering::Release);

        let store = self.flow.store();
        for (entry, stored) in [
            ("order id", store.set(keys::ORDER_ID, &order.id.to_string())),
            ("order number", store.set(keys::ORDER_NUMBER, &order.number())),
            ("checkout selection", store.clear_checkout()),
        ] {
            if let Err(e) = stored {
                warn!(error = %e, order_id = %order.id, "failed to update {entry} after order");
            }
        }

        if let Err(e) = self.flow.cart().clear().await {
            warn!(error = %e, "failed to clear cart after order");
        }

        info!(order_id = %order.id, order_number = %order.number(), "order placed");
        self.flow.navigator().navigate(&Step::Success.route());
        Ok(order)
    }
}
