//! Entities the checkout flow works on.
//!
//! Cart items and order items refer to products by id only; products are
//! looked up through a [`ProductArena`] loaded alongside the cart.

use std::{collections::HashMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub price: Decimal,
    pub quantity: i32,
}

pub type ProductArena = HashMap<Uuid, Product>;

/// Largest unit price the `NUMERIC(12, 2)` price columns can hold.
pub fn max_unit_price() -> Decimal {
    Decimal::new(9_999_999_999_99, 2)
}

/// Largest order total the `NUMERIC(14, 2)` total column can hold.
pub fn max_order_total() -> Decimal {
    Decimal::new(999_999_999_999_99, 2)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CartItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cart {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn new(owner_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            items: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn product_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.items.iter().map(|item| item.product_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(OrderStatus::Created),
            other => Err(anyhow::anyhow!("unknown order status {other:?}")),
        }
    }
}

/// Line of an order, copied from a cart item at checkout time.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
}
