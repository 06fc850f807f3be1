//! What the customer has chosen so far, as persisted in the session store.

use bazaar_core::{AddressId, OrderId, PaymentMethod};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::{SessionStore, keys};

/// Card details captured on the payment step, stored as JSON under `cardData`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardData {
    pub card_number: String,
    pub card_holder_name: String,
    pub expiry_month: u32,
    pub expiry_year: i32,
    pub cvv: String,
}

impl CardData {
    /// Card number with all but the last four digits hidden.
    #[must_use]
    pub fn masked_number(&self) -> String {
        let digits: Vec<char> = self.card_number.chars().collect();
        let last_four: String = digits
            .iter()
            .skip(digits.len().saturating_sub(4))
            .collect();
        format!("**** **** **** {last_four}")
    }
}

impl std::fmt::Debug for CardData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardData")
            .field("card_number", &self.masked_number())
            .field("card_holder_name", &self.card_holder_name)
            .field("expiry_month", &self.expiry_month)
            .field("expiry_year", &self.expiry_year)
            .finish_non_exhaustive()
    }
}

/// Snapshot of the checkout keys in the session store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutSelection {
    pub shipping_address_id: Option<AddressId>,
    pub billing_address_id: Option<AddressId>,
    pub payment_method: Option<PaymentMethod>,
    pub card_data: Option<CardData>,
    pub order_id: Option<OrderId>,
    pub order_number: Option<String>,
}

impl CheckoutSelection {
    /// Read every checkout key. Unparseable values are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be read.
    pub fn load(store: &SessionStore) -> Result<Self> {
        Ok(Self {
            shipping_address_id: store.get_parsed(keys::SHIPPING_ADDRESS_ID)?,
            billing_address_id: store.get_parsed(keys::BILLING_ADDRESS_ID)?,
            payment_method: store.get_parsed(keys::PAYMENT_METHOD)?,
            card_data: SessionStore::get_json(store.session(), keys::CARD_DATA)?,
            order_id: store.get_parsed(keys::ORDER_ID)?,
            order_number: store
                .get(keys::ORDER_NUMBER)?
                .filter(|n| !n.trim().is_empty()),
        })
    }
}
