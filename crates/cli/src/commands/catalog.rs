//! Catalogue browsing and reviews.

use bazaar_client::services::ReviewService;
use bazaar_client::{Marketplace, Result};
use bazaar_core::{CategoryId, ProductId, ReviewId, UserId};
use clap::Subcommand;
use rust_decimal::Decimal;

use crate::output;

#[derive(Subcommand)]
pub enum ProductAction {
    /// List products, optionally filtered
    List {
        #[arg(long)]
        category: Option<i64>,

        #[arg(long)]
        seller: Option<i64>,
    },
    /// Search products by name
    Search { name: String },
    /// Products within a price range
    Price {
        #[arg(long)]
        min: Option<Decimal>,

        #[arg(long)]
        max: Option<Decimal>,
    },
    /// Show one product with its reviews
    Show { id: i64 },
    /// List categories
    Categories,
}

#[derive(Subcommand)]
pub enum ReviewAction {
    /// Review a product
    Add {
        product: i64,

        #[arg(short, long)]
        rating: u8,

        #[arg(short, long)]
        comment: String,
    },
    /// Edit one of your reviews
    Edit {
        id: i64,

        #[arg(long)]
        product: i64,

        #[arg(short, long)]
        rating: u8,

        #[arg(short, long)]
        comment: String,
    },
    /// Delete one of your reviews
    Delete { id: i64 },
}

pub async fn products(market: &Marketplace, action: ProductAction) -> Result<()> {
    let products = market.products();
    let listing = match action {
        ProductAction::List {
            category: Some(category),
            ..
        } => products.by_category(CategoryId::new(category)).await?,
        ProductAction::List {
            seller: Some(seller),
            ..
        } => products.by_seller(UserId::new(seller)).await?,
        ProductAction::List { .. } => products.list().await?,
        ProductAction::Search { name } => products.search(&name).await?,
        ProductAction::Price { min, max } => products.by_price_range(min, max).await?,
        ProductAction::Show { id } => return show(market, ProductId::new(id)).await,
        ProductAction::Categories => {
            for category in products.categories().await? {
                output::line(format!("#{:<5} {}", category.id, category.name));
            }
            return Ok(());
        }
    };

    if listing.is_empty() {
        output::line("No products found");
    }
    for product in &listing {
        output::product(product);
    }
    Ok(())
}

async fn show(market: &Marketplace, id: ProductId) -> Result<()> {
    let product = market.products().get(id).await?;
    output::product(&product);
    if let Some(description) = product.description.as_deref() {
        output::line(format!("  {description}"));
    }
    if let Some(seller) = &product.seller {
        output::line(format!("  sold by {}", seller.username));
    }

    let reviews = market.reviews().for_product(id).await?;
    match ReviewService::average_rating(&reviews) {
        Some(average) => output::line(format!(
            "  {average:.1} / 5 from {} review(s)",
            reviews.len()
        )),
        None => output::line("  No reviews yet"),
    }
    for review in &reviews {
        output::review(review);
    }
    Ok(())
}

pub async fn reviews(market: &Marketplace, action: ReviewAction) -> Result<()> {
    match action {
        ReviewAction::Add {
            product,
            rating,
            comment,
        } => {
            let review = market
                .reviews()
                .create(ProductId::new(product), rating, &comment)
                .await?;
            output::review(&review);
        }
        ReviewAction::Edit {
            id,
            product,
            rating,
            comment,
        } => {
            let review = market
                .reviews()
                .update(ReviewId::new(id), ProductId::new(product), rating, &comment)
                .await?;
            output::review(&review);
        }
        ReviewAction::Delete { id } => {
            market.reviews().delete(ReviewId::new(id)).await?;
            output::line("Review deleted");
        }
    }
    Ok(())
}
