//! Checkout, one step per command.

use bazaar_client::checkout::CardForm;
use bazaar_client::{Entry, Marketplace, Result};
use bazaar_core::{AddressId, PaymentMethod};
use clap::Subcommand;

use super::addresses::AddressFields;
use crate::output;

#[derive(Subcommand)]
pub enum CheckoutAction {
    /// Choose shipping and billing addresses
    Address {
        /// Shipping address id; defaults to the preselected one
        #[arg(long)]
        shipping: Option<i64>,

        /// Separate billing address id
        #[arg(long, conflicts_with = "same_as_shipping")]
        billing: Option<i64>,

        /// Bill to the shipping address
        #[arg(long)]
        same_as_shipping: bool,

        /// Only show the choices
        #[arg(long)]
        dry_run: bool,
    },
    /// Save a new address and ship to it
    NewAddress(AddressFields),
    /// Choose how to pay
    Payment {
        /// `CREDIT_CARD`, `CASH_ON_DELIVERY` or `BANK_TRANSFER`
        #[arg(short, long)]
        method: PaymentMethod,

        #[arg(long, default_value = "")]
        card_number: String,

        #[arg(long, default_value = "")]
        card_holder: String,

        #[arg(long, default_value = "")]
        expiry_month: String,

        #[arg(long, default_value = "")]
        expiry_year: String,

        #[arg(long, default_value = "")]
        cvc: String,
    },
    /// Review the order, and place it with `--place`
    Confirm {
        #[arg(long)]
        place: bool,
    },
    /// Show the placed order
    Success {
        /// Go to the order history afterwards
        #[arg(long)]
        orders: bool,
    },
}

pub async fn run(market: &Marketplace, action: CheckoutAction) -> Result<()> {
    let flow = market.checkout();
    match action {
        CheckoutAction::Address {
            shipping,
            billing,
            same_as_shipping,
            dry_run,
        } => {
            let entry = flow.enter_address().await?;
            output::redirected(&entry);
            let Entry::Ready(mut step) = entry else {
                return Ok(());
            };
            if let Some(id) = shipping {
                step.select_shipping(AddressId::new(id))?;
            }
            if let Some(id) = billing {
                step.select_billing(AddressId::new(id))?;
            } else if same_as_shipping {
                step.set_billing_same_as_shipping(true);
            }

            for address in step.addresses() {
                let marker = if address.id == step.selected_shipping() {
                    "*"
                } else {
                    " "
                };
                output::line(format!("{marker} {}", address_line(address)));
            }
            if !dry_run {
                step.proceed()?;
                output::line(format!("Next: {}", market.navigator().current_path()));
            }
        }
        CheckoutAction::NewAddress(fields) => {
            let entry = flow.enter_address().await?;
            output::redirected(&entry);
            if let Entry::Ready(mut step) = entry {
                let created = step.add_address(&fields.into()).await?;
                output::line(format!("Shipping to {}", address_line(created)));
                step.proceed()?;
            }
        }
        CheckoutAction::Payment {
            method,
            card_number,
            card_holder,
            expiry_month,
            expiry_year,
            cvc,
        } => {
            let entry = flow.enter_payment()?;
            output::redirected(&entry);
            if let Entry::Ready(mut step) = entry {
                step.select_method(method);
                step.set_card(CardForm {
                    card_number,
                    card_holder_name: card_holder,
                    expiry_month,
                    expiry_year,
                    cvc,
                });
                step.confirm()?;
                output::line(format!("Paying by {}", method.label()));
            }
        }
        CheckoutAction::Confirm { place } => {
            let entry = flow.enter_confirmation().await?;
            output::redirected(&entry);
            let Entry::Ready(step) = entry else {
                return Ok(());
            };
            if let Some(error) = step.error() {
                output::line(format!("! {error}"));
            }
            if let Some(address) = step.shipping_address() {
                output::line(format!("Ship to: {}", address.summary()));
            }
            if let Some(address) = step.billing_address() {
                output::line(format!("Bill to: {}", address.summary()));
            }
            let payment = step.masked_card().map_or_else(
                || step.method_label().to_string(),
                |card| format!("{} {card}", step.method_label()),
            );
            output::line(format!("Payment: {payment}"));
            let items = step.items();
            let count = items.iter().map(|i| i.quantity).sum();
            output::cart(&items, step.subtotal(), count);
            output::line(format!("Shipping: {}", step.shipping_fee()));
            output::line(format!("Total: {}", step.total()));

            if place {
                let order = step.place_order().await?;
                output::line(format!("Order {} placed", order.number()));
            }
        }
        CheckoutAction::Success { orders } => {
            let entry = flow.enter_success()?;
            output::redirected(&entry);
            if let Entry::Ready(step) = entry {
                output::line(format!(
                    "Thank you! Your order number is {}",
                    step.order_number()
                ));
                if orders {
                    step.view_orders();
                } else {
                    step.continue_shopping();
                }
            }
        }
    }
    Ok(())
}

fn address_line(address: &bazaar_client::models::Address) -> String {
    let id = address.id.map_or_else(|| "-".to_string(), |id| id.to_string());
    format!("#{id} {}", address.summary())
}
