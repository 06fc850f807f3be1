//! Order history commands.

use bazaar_client::{Marketplace, Result, Route};
use bazaar_core::OrderId;
use clap::Subcommand;

use crate::output;

#[derive(Subcommand)]
pub enum OrderAction {
    /// List your orders
    List,
    /// Show one order
    Show { id: i64 },
    /// Cancel an order that has not shipped
    Cancel { id: i64 },
}

pub async fn run(market: &Marketplace, action: Option<OrderAction>) -> Result<()> {
    market.navigator().navigate(&Route::AccountOrders);
    let orders = market.orders();
    match action.unwrap_or(OrderAction::List) {
        OrderAction::List => {
            let list = orders.list().await?;
            if list.is_empty() {
                output::line("No orders yet");
            }
            for order in &list {
                output::order(order);
            }
        }
        OrderAction::Show { id } => output::order_detail(&orders.get(OrderId::new(id)).await?),
        OrderAction::Cancel { id } => {
            let order = orders.cancel(OrderId::new(id)).await?;
            output::order(&order);
        }
    }
    Ok(())
}
