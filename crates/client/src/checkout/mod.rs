//! The four-step checkout flow: address, payment, confirmation, success.
//!
//! Each step is entered through [`CheckoutFlow`], which checks the session
//! store for the selections earlier steps should have made. A step whose
//! prerequisites are missing is never shown: the flow navigates to the
//! earliest unmet step and returns [`Entry::Redirect`].
//!
//! ```text
//! /checkout/address ──▶ /checkout/payment ──▶ /checkout/confirm ──▶ /checkout/success
//!   shippingAddressId     paymentMethod          orderId
//!   billingAddressId?     cardData?              orderNumber
//! ```

mod address;
mod confirmation;
mod payment;
mod selection;
mod success;

pub use address::{AddressStep, BillingChoice};
pub use confirmation::{COD_SURCHARGE_CENTS, ConfirmationStep};
pub use payment::{CardForm, PaymentStep};
pub use selection::{CardData, CheckoutSelection};
pub use success::SuccessStep;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::auth::AuthGate;
use crate::cart::CartCoordinator;
use crate::error::{ClientError, Result};
use crate::navigation::{Navigator, Route};
use crate::services::{AddressService, OrderService};
use crate::storage::SessionStore;

/// A checkout step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Address,
    Payment,
    Confirmation,
    Success,
}

impl Step {
    /// The route that displays this step.
    #[must_use]
    pub const fn route(self) -> Route {
        match self {
            Self::Address => Route::CheckoutAddress,
            Self::Payment => Route::CheckoutPayment,
            Self::Confirmation => Route::CheckoutConfirm,
            Self::Success => Route::CheckoutSuccess,
        }
    }
}

/// Result of entering a step.
#[derive(Debug)]
pub enum Entry<T> {
    /// Prerequisites are met; the step is ready to use.
    Ready(T),
    /// Prerequisites are missing; the navigator has moved to this route.
    Redirect(Route),
}

impl<T> Entry<T> {
    /// The step, if ready.
    #[must_use]
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(step) => Some(step),
            Self::Redirect(_) => None,
        }
    }

    /// The redirect target, if any.
    #[must_use]
    pub const fn redirect(&self) -> Option<&Route> {
        match self {
            Self::Ready(_) => None,
            Self::Redirect(route) => Some(route),
        }
    }
}

/// Coordinates the checkout steps.
#[derive(Clone)]
pub struct CheckoutFlow {
    inner: Arc<CheckoutFlowInner>,
}

struct CheckoutFlowInner {
    auth: AuthGate,
    cart: CartCoordinator,
    addresses: AddressService,
    orders: OrderService,
    placing: AtomicBool,
}

/// Marks an order submission in flight; released on drop.
pub(crate) struct PlacingGuard<'a>(&'a AtomicBool);

impl<'a> PlacingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ClientError::OrderInFlight)?;
        Ok(Self(flag))
    }
}

impl Drop for PlacingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CheckoutFlow {
    #[must_use]
    pub fn new(
        auth: AuthGate,
        cart: CartCoordinator,
        addresses: AddressService,
        orders: OrderService,
    ) -> Self {
        Self {
            inner: Arc::new(CheckoutFlowInner {
                auth,
                cart,
                addresses,
                orders,
                placing: AtomicBool::new(false),
            }),
        }
    }

    pub(crate) fn store(&self) -> &SessionStore {
        self.inner.auth.store()
    }

    pub(crate) fn navigator(&self) -> &Navigator {
        self.inner.auth.navigator()
    }

    pub(crate) fn cart(&self) -> &CartCoordinator {
        &self.inner.cart
    }

    pub(crate) fn addresses(&self) -> &AddressService {
        &self.inner.addresses
    }

    pub(crate) fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    pub(crate) fn begin_order(&self) -> Result<PlacingGuard<'_>> {
        PlacingGuard::acquire(&self.inner.placing)
    }

    /// Whether an order submission is in progress.
    #[must_use]
    pub fn is_placing_order(&self) -> bool {
        self.inner.placing.load(Ordering::Acquire)
    }

    /// Current selections.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be read.
    pub fn selection(&self) -> Result<CheckoutSelection> {
        CheckoutSelection::load(self.store())
    }

    /// The earliest step whose prerequisites for `step` are missing, if any.
    fn unmet(step: Step, selection: &CheckoutSelection) -> Option<Step> {
        match step {
            Step::Address => None,
            Step::Payment => selection.shipping_address_id.is_none().then_some(Step::Address),
            Step::Confirmation => {
                if selection.shipping_address_id.is_none() {
                    Some(Step::Address)
                } else {
                    match selection.payment_method {
                        None => Some(Step::Payment),
                        Some(method) if method.requires_card() && selection.card_data.is_none() => {
                            Some(Step::Payment)
                        }
                        Some(_) => None,
                    }
                }
            }
            Step::Success => None,
        }
    }

    /// Check sign-in and the prerequisites of `step`, navigating away when
    /// they are not met.
    fn guard(&self, step: Step) -> Result<std::result::Result<CheckoutSelection, Route>> {
        if !self.inner.auth.is_logged_in() {
            let return_url = self.navigator().redirect_to_login();
            return Ok(Err(Route::Login {
                return_url: Some(return_url),
            }));
        }
        let selection = self.selection()?;
        if let Some(missing) = Self::unmet(step, &selection) {
            debug!(?step, ?missing, "checkout prerequisites missing");
            let route = missing.route();
            self.navigator().navigate(&route);
            return Ok(Err(route));
        }
        self.navigator().navigate(&step.route());
        Ok(Ok(selection))
    }

    /// Enter the address step and load the address book.
    ///
    /// # Errors
    ///
    /// Returns the address loading error.
    pub async fn enter_address(&self) -> Result<Entry<AddressStep>> {
        match self.guard(Step::Address)? {
            Ok(selection) => Ok(Entry::Ready(AddressStep::load(self.clone(), &selection).await?)),
            Err(route) => Ok(Entry::Redirect(route)),
        }
    }

    /// Enter the payment step. Requires a shipping address.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be read.
    pub fn enter_payment(&self) -> Result<Entry<PaymentStep>> {
        match self.guard(Step::Payment)? {
            Ok(selection) => match selection.shipping_address_id {
                Some(shipping) => Ok(Entry::Ready(PaymentStep::new(
                    self.clone(),
                    shipping,
                    &selection,
                ))),
                None => Ok(Entry::Redirect(Step::Address.route())),
            },
            Err(route) => Ok(Entry::Redirect(route)),
        }
    }

    /// Enter the confirmation step, loading addresses and cart concurrently.
    /// Requires a shipping address, a payment method and, for cards, card data.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be read. Address and cart
    /// loading failures are recorded on the step instead.
    pub async fn enter_confirmation(&self) -> Result<Entry<ConfirmationStep>> {
        match self.guard(Step::Confirmation)? {
            Ok(selection) => Ok(Entry::Ready(
                ConfirmationStep::load(self.clone(), selection).await?,
            )),
            Err(route) => Ok(Entry::Redirect(route)),
        }
    }

    /// Enter the success step. Requires a placed order; otherwise goes home.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be accessed.
    pub fn enter_success(&self) -> Result<Entry<SuccessStep>> {
        let selection = self.selection()?;
        SuccessStep::enter(self.clone(), &selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::selection::CardData;
    use bazaar_core::{AddressId, PaymentMethod};

    fn selection(
        shipping: Option<i64>,
        method: Option<PaymentMethod>,
        card: bool,
    ) -> CheckoutSelection {
        CheckoutSelection {
            shipping_address_id: shipping.map(AddressId::new),
            payment_method: method,
            card_data: card.then(|| CardData {
                card_number: "4111111111111111".to_string(),
                card_holder_name: "J".to_string(),
                expiry_month: 1,
                expiry_year: 2030,
                cvv: "123".to_string(),
            }),
            ..CheckoutSelection::default()
        }
    }

    #[test]
    fn test_payment_requires_shipping() {
        assert_eq!(
            CheckoutFlow::unmet(Step::Payment, &selection(None, None, false)),
            Some(Step::Address)
        );
        assert_eq!(
            CheckoutFlow::unmet(Step::Payment, &selection(Some(7), None, false)),
            None
        );
    }

    #[test]
    fn test_confirmation_redirects_to_earliest_missing() {
        let unmet = |s| CheckoutFlow::unmet(Step::Confirmation, &s);
        assert_eq!(
            unmet(selection(None, Some(PaymentMethod::BankTransfer), false)),
            Some(Step::Address)
        );
        assert_eq!(unmet(selection(Some(7), None, false)), Some(Step::Payment));
        assert_eq!(
            unmet(selection(Some(7), Some(PaymentMethod::CreditCard), false)),
            Some(Step::Payment)
        );
        assert_eq!(
            unmet(selection(Some(7), Some(PaymentMethod::CreditCard), true)),
            None
        );
        assert_eq!(
            unmet(selection(Some(7), Some(PaymentMethod::CashOnDelivery), false)),
            None
        );
    }

    #[test]
    fn test_placing_guard_rejects_second_submission() {
        let flag = AtomicBool::new(false);
        let first = PlacingGuard::acquire(&flag);
        assert!(first.is_ok());
        assert!(matches!(
            PlacingGuard::acquire(&flag),
            Err(ClientError::OrderInFlight)
        ));
        drop(first);
        assert!(PlacingGuard::acquire(&flag).is_ok());
    }
}
