//! Terminal rendering of client state.

use bazaar_client::Entry;
use bazaar_client::models::{Address, CartItem, Order, Product, Review, UserProfile};

/// Print one line.
#[allow(clippy::print_stdout)]
pub fn line(text: impl AsRef<str>) {
    println!("{}", text.as_ref());
}

/// Report where a step sent the user instead of showing it.
pub fn redirected<T>(entry: &Entry<T>) {
    if let Some(route) = entry.redirect() {
        line(format!("Redirected to {}", route.path()));
    }
}

pub fn product(product: &Product) {
    let category = product
        .category
        .as_ref()
        .map_or_else(String::new, |c| format!(" [{}]", c.name));
    line(format!(
        "#{:<5} {:<40} {:>10}  stock {:>4}{category}",
        product.id, product.name, product.price, product.stock_quantity
    ));
}

pub fn review(review: &Review) {
    line(format!(
        "#{:<5} {} {}  {}",
        review.id,
        "*".repeat(usize::from(review.rating)),
        review.author_name(),
        review.comment
    ));
}

pub fn cart(items: &[CartItem], total: impl std::fmt::Display, count: u32) {
    if items.is_empty() {
        line("Your cart is empty");
        return;
    }
    for item in items {
        let stock = item
            .product
            .stock_quantity
            .map_or_else(String::new, |s| format!(" (stock {s})"));
        line(format!(
            "#{:<5} {:<40} x{:<3} {:>10}{stock}",
            item.product.id,
            item.product.name,
            item.quantity,
            item.line_total()
        ));
    }
    line(format!("{count} item(s), total {total}"));
}

pub fn address(address: &Address) {
    let id = address.id.map_or_else(|| "-".to_string(), |id| id.to_string());
    let marker = if address.is_default { " (default)" } else { "" };
    line(format!("#{id:<5} {}{marker}", address.summary()));
}

pub fn order(order: &Order) {
    let status = order
        .status
        .map_or_else(|| "UNKNOWN".to_string(), |s| s.to_string());
    let total = order
        .total_amount
        .map_or_else(|| "-".to_string(), |t| t.to_string());
    let date = order
        .order_date
        .map_or_else(String::new, |d| d.format("%Y-%m-%d %H:%M").to_string());
    line(format!(
        "#{:<5} {:<16} {:<10} {:>10}  {date}",
        order.id,
        order.number(),
        status,
        total
    ));
}

pub fn order_detail(order: &Order) {
    self::order(order);
    if let Some(method) = &order.payment_method {
        line(format!("  payment: {method}"));
    }
    if let Some(tracking) = &order.tracking_number {
        line(format!("  tracking: {tracking}"));
    }
    for item in &order.items {
        line(format!(
            "  {} x{} {}",
            item.product_name,
            item.quantity,
            item.subtotal.unwrap_or_else(|| item.price.times(item.quantity))
        ));
    }
}

pub fn user(user: &UserProfile) {
    let banned = if user.banned.unwrap_or(false) {
        " (banned)"
    } else {
        ""
    };
    line(format!(
        "#{:<5} {:<20} {:<30} {}{banned}",
        user.id,
        user.username,
        user.email,
        user.role.display_name()
    ));
}
