use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::product::Product;
use crate::domain::quantity::Quantity;

/// One product in a cart. Members' line ids are `cart_items` row ids;
/// guests' are generated locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartLine {
    pub id: Uuid,
    pub product: Product,
    pub quantity: Quantity,
}

impl CartLine {
    pub fn line_total_cents(&self) -> i64 {
        self.product.price_cents * i64::from(self.quantity)
    }
}

/// Persisted `cart_items` row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: String,
    pub quantity: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartRow {
    pub user_id: Uuid,
    pub product_id: String,
    pub quantity: Quantity,
}

pub fn total_cents(lines: &[CartLine]) -> i64 {
    lines.iter().map(CartLine::line_total_cents).sum()
}

pub fn total_items(lines: &[CartLine]) -> u32 {
    lines.iter().map(|l| u32::from(l.quantity.get())).sum()
}
