//! Step 4: the order went through.

use bazaar_core::OrderId;
use tracing::debug;

use super::{CheckoutFlow, CheckoutSelection, Entry};
use crate::error::Result;
use crate::navigation::Route;

/// The success page for a placed order.
pub struct SuccessStep {
    flow: CheckoutFlow,
    order_id: OrderId,
    order_number: String,
}

impl std::fmt::Debug for SuccessStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuccessStep")
            .field("order_id", &self.order_id)
            .field("order_number", &self.order_number)
            .finish_non_exhaustive()
    }
}

impl SuccessStep {
    /// Show the placed order, or go home when there is none.
    ///
    /// Checkout keys left over in the session store are removed either way.
    pub(super) fn enter(flow: CheckoutFlow, selection: &CheckoutSelection) -> Result<Entry<Self>> {
        let (Some(order_id), Some(order_number)) =
            (selection.order_id, selection.order_number.clone())
        else {
            debug!("no placed order in session, going home");
            flow.navigator().navigate(&Route::Home);
            return Ok(Entry::Redirect(Route::Home));
        };

        flow.store().clear_checkout()?;
        flow.navigator().navigate(&Route::CheckoutSuccess);
        Ok(Entry::Ready(Self {
            flow,
            order_id,
            order_number,
        }))
    }

    #[must_use]
    pub const fn order_id(&self) -> OrderId {
        self.order_id
    }

    #[must_use]
    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    /// Go to the order history.
    pub fn view_orders(&self) {
        self.flow.navigator().navigate(&Route::AccountOrders);
    }

    /// Go back to the catalogue.
    pub fn continue_shopping(&self) {
        self.flow.navigator().navigate(&Route::Products);
    }
}
