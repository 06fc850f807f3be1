//! Shopping cart commands.

use bazaar_client::{Marketplace, Result, Route};
use bazaar_core::ProductId;
use clap::Subcommand;

use crate::output;

#[derive(Subcommand)]
pub enum CartAction {
    /// Show the cart
    Show,
    /// Add a product
    Add {
        product: i64,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a product's quantity; zero or less removes it
    Update {
        product: i64,

        #[arg(allow_hyphen_values = true)]
        quantity: i64,
    },
    /// Remove a product
    Remove { product: i64 },
    /// Empty the cart
    Clear,
}

pub async fn run(market: &Marketplace, action: Option<CartAction>) -> Result<()> {
    market.navigator().navigate(&Route::Cart);
    let cart = market.cart();
    cart.load().await?;

    match action.unwrap_or(CartAction::Show) {
        CartAction::Show => {}
        CartAction::Add { product, quantity } => {
            let product = market.products().get(ProductId::new(product)).await?;
            cart.add(&product, quantity).await?;
            output::line(format!("Added {quantity} x {}", product.name));
        }
        CartAction::Update { product, quantity } => {
            cart.update_quantity(ProductId::new(product), quantity).await?;
        }
        CartAction::Remove { product } => cart.remove(ProductId::new(product)).await?,
        CartAction::Clear => cart.clear().await?,
    }

    output::cart(&cart.items(), cart.total_price(), cart.total_items());
    Ok(())
}
