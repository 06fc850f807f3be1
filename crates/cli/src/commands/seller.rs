//! Seller dashboard: own products and fulfilment.

use bazaar_client::models::ProductRequest;
use bazaar_client::{ClientError, Marketplace, Result};
use bazaar_core::{CategoryId, OrderId, OrderStatus, ProductId};
use clap::{Args, Subcommand};
use rust_decimal::Decimal;

use crate::output;

#[derive(Args)]
pub struct ProductFields {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub price: Decimal,

    #[arg(long)]
    pub stock: u32,

    #[arg(long)]
    pub category: i64,

    #[arg(long)]
    pub image_url: Option<String>,
}

#[derive(Subcommand)]
pub enum SellerAction {
    /// Your products
    Products,
    /// List a new product
    AddProduct(ProductFields),
    /// Replace one of your products
    EditProduct {
        id: i64,

        #[command(flatten)]
        fields: ProductFields,
    },
    /// Remove one of your products
    DeleteProduct { id: i64 },
    /// Orders containing your products
    Orders,
    /// Move an order to a new status
    Status {
        order: i64,

        /// e.g. `PROCESSING`, `SHIPPED`, `DELIVERED`
        status: OrderStatus,
    },
}

pub async fn run(market: &Marketplace, action: SellerAction) -> Result<()> {
    match action {
        SellerAction::Products => {
            let seller_id = market.auth().require_user()?;
            for product in &market.products().by_seller(seller_id).await? {
                output::product(product);
            }
        }
        SellerAction::AddProduct(fields) => {
            let request = product_request(market, fields)?;
            output::product(&market.products().create(&request).await?);
        }
        SellerAction::EditProduct { id, fields } => {
            let request = product_request(market, fields)?;
            output::product(
                &market
                    .products()
                    .update(ProductId::new(id), &request)
                    .await?,
            );
        }
        SellerAction::DeleteProduct { id } => {
            market.products().delete(ProductId::new(id)).await?;
            output::line("Product deleted");
        }
        SellerAction::Orders => {
            for order in &market.orders().seller_orders().await? {
                output::order_detail(order);
            }
        }
        SellerAction::Status { order, status } => {
            let id = OrderId::new(order);
            let order = market
                .orders()
                .seller_orders()
                .await?
                .into_iter()
                .find(|o| o.id == id)
                .ok_or_else(|| ClientError::Validation(format!("Order {id} not found")))?;
            output::order(&market.orders().update_status(&order, status).await?);
        }
    }
    Ok(())
}

fn product_request(market: &Marketplace, fields: ProductFields) -> Result<ProductRequest> {
    let seller_id = market.auth().require_user()?;
    Ok(ProductRequest {
        name: fields.name,
        description: fields.description,
        price: fields.price,
        image_url: fields.image_url,
        stock_quantity: fields.stock,
        category_id: CategoryId::new(fields.category),
        seller_id,
    })
}
