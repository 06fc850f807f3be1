//! Step 1: choose shipping and billing addresses.

use bazaar_core::AddressId;
use tracing::{info, instrument};

use super::{CheckoutFlow, CheckoutSelection, Step};
use crate::error::{ClientError, Result};
use crate::models::Address;
use crate::storage::keys;

/// Where the invoice goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BillingChoice {
    #[default]
    SameAsShipping,
    /// A separate billing address; `None` until one is picked.
    Separate(Option<AddressId>),
}

/// The address step, with the user's address book loaded.
pub struct AddressStep {
    flow: CheckoutFlow,
    addresses: Vec<Address>,
    shipping: Option<AddressId>,
    billing: BillingChoice,
}

impl std::fmt::Debug for AddressStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressStep")
            .field("addresses", &self.addresses.len())
            .field("shipping", &self.shipping)
            .field("billing", &self.billing)
            .finish_non_exhaustive()
    }
}

impl AddressStep {
    /// Load the address book and preselect a shipping address: the one
    /// chosen earlier in this session if it still exists, else the default,
    /// else the first.
    pub(super) async fn load(flow: CheckoutFlow, selection: &CheckoutSelection) -> Result<Self> {
        let addresses = flow.addresses().list().await?;

        let known = |id: AddressId| addresses.iter().any(|a| a.id == Some(id));
        let shipping = selection
            .shipping_address_id
            .filter(|id| known(*id))
            .or_else(|| addresses.iter().find(|a| a.is_default).and_then(|a| a.id))
            .or_else(|| addresses.first().and_then(|a| a.id));
        let billing = match selection.billing_address_id {
            Some(id) if Some(id) != shipping && known(id) => BillingChoice::Separate(Some(id)),
            _ => BillingChoice::SameAsShipping,
        };

        Ok(Self {
            flow,
            addresses,
            shipping,
            billing,
        })
    }

    #[must_use]
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    #[must_use]
    pub const fn selected_shipping(&self) -> Option<AddressId> {
        self.shipping
    }

    #[must_use]
    pub const fn billing(&self) -> BillingChoice {
        self.billing
    }

    fn ensure_known(&self, id: AddressId) -> Result<()> {
        if self.addresses.iter().any(|a| a.id == Some(id)) {
            Ok(())
        } else {
            Err(ClientError::Validation(format!("Unknown address {id}")))
        }
    }

    /// Choose the shipping address.
    ///
    /// # Errors
    ///
    /// `ClientError::Validation` for an id not in the address book.
    pub fn select_shipping(&mut self, id: AddressId) -> Result<()> {
        self.ensure_known(id)?;
        self.shipping = Some(id);
        Ok(())
    }

    /// Toggle "billing same as shipping".
    pub fn set_billing_same_as_shipping(&mut self, same: bool) {
        self.billing = if same {
            BillingChoice::SameAsShipping
        } else {
            match self.billing {
                BillingChoice::Separate(id) => BillingChoice::Separate(id),
                BillingChoice::SameAsShipping => BillingChoice::Separate(None),
            }
        };
    }

    /// Choose a separate billing address.
    ///
    /// # Errors
    ///
    /// `ClientError::Validation` for an id not in the address book.
    pub fn select_billing(&mut self, id: AddressId) -> Result<()> {
        self.ensure_known(id)?;
        self.billing = BillingChoice::Separate(Some(id));
        Ok(())
    }

    /// Save a new address and select it for shipping.
    ///
    /// # Errors
    ///
    /// `ClientError::Validation` for missing fields, otherwise the backend
    /// error.
    #[instrument(skip(self, address))]
    pub async fn add_address(&mut self, address: &Address) -> Result<&Address> {
        let created = self.flow.addresses().create(address).await?;
        let id = created.id.ok_or_else(|| {
            ClientError::Validation("The server did not return an address id".to_string())
        })?;
        self.addresses.push(created);
        self.shipping = Some(id);
        self.addresses
            .last()
            .ok_or_else(|| ClientError::Validation("address list is empty".to_string()))
    }

    /// Persist the choice and move to the payment step.
    ///
    /// # Errors
    ///
    /// `ClientError::MissingSelection` without a known shipping address.
    #[instrument(skip(self))]
    pub fn proceed(&self) -> Result<()> {
        let shipping = self
            .shipping
            .filter(|id| self.ensure_known(*id).is_ok())
            .ok_or_else(|| {
                ClientError::MissingSelection("Please select a shipping address".to_string())
            })?;

        let store = self.flow.store();
        store.set(keys::SHIPPING_ADDRESS_ID, &shipping.to_string())?;
        match self.billing {
            BillingChoice::SameAsShipping => {
                store.set(keys::BILLING_ADDRESS_ID, &shipping.to_string())?;
            }
            BillingChoice::Separate(Some(id)) => {
                store.set(keys::BILLING_ADDRESS_ID, &id.to_string())?;
            }
            BillingChoice::Separate(None) => store.remove(keys::BILLING_ADDRESS_ID)?,
        }

        info!(shipping_address_id = %shipping, billing = ?self.billing, "address step complete");
        self.flow.navigator().navigate(&Step::Payment.route());
        Ok(())
    }
}
