//! Cart checkout: turns a user's cart into a persisted order.

use std::collections::HashMap;

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    domain::{Cart, Order, OrderItem, OrderStatus, ProductArena, max_order_total},
    error::{AppError, AppResult},
    models::OrderView,
    response::{ApiResponse, Meta},
};

pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::MemoryStorage;
pub use postgres::PgStorage;
pub use store::{CartStore, OrderStore, ProductStore, Storage, UnitOfWork};

pub struct CheckoutService<S> {
    storage: S,
}

impl<S: Storage> CheckoutService<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Converts the owner's cart into a `CREATED` order.
    ///
    /// Validation happens before any write. All writes go through one unit of
    /// work, which is committed only after the order and the emptied cart are
    /// saved; on any failure it is dropped and nothing is persisted.
    pub async fn checkout(&self, owner_id: Uuid) -> AppResult<OrderView> {
        let mut unit = self.storage.begin().await?;

        let mut cart = unit
            .find_cart_by_owner(owner_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Cart not found for user {owner_id}")))?;

        if cart.is_empty() {
            return Err(AppError::InvalidState("Cart is empty".into()));
        }

        let products = unit.find_products(&cart.product_ids()).await?;
        ensure_stock(&cart, &products)?;
        let total_price = order_total(&cart, &products)?;

        for item in &cart.items {
            unit.decrement_stock(item.product_id, item.quantity).await?;
        }

        let order = Order {
            id: Uuid::new_v4(),
            owner_id,
            status: OrderStatus::Created,
            items: snapshot_items(&cart, &products)?,
            total_price,
            created_at: Utc::now(),
        };
        let order = unit.save_order(order).await?;

        cart.items.clear();
        unit.save_cart(cart).await?;

        unit.commit().await?;

        tracing::info!(
            order_id = %order.id,
            user_id = %owner_id,
            total = %order.total_price,
            items = order.items.len(),
            "checkout completed"
        );

        Ok(OrderView::from(&order))
    }
}

/// Runs a checkout and renders the outcome, funnelling failures through [`AppError`].
pub async fn respond<S: Storage>(service: &CheckoutService<S>, owner_id: Uuid) -> Response {
    match service.checkout(owner_id).await {
        Ok(view) => Json(ApiResponse::success(
            "Checkout success",
            view,
            Some(Meta::empty()),
        ))
        .into_response(),
        Err(err) => err.into_response(),
    }
}

fn ensure_stock(cart: &Cart, products: &ProductArena) -> AppResult<()> {
    let mut requested: HashMap<Uuid, i32> = HashMap::new();
    for item in &cart.items {
        if item.quantity <= 0 {
            return Err(AppError::InvalidArgument(format!(
                "Cart has invalid quantity for product {}",
                item.product_id
            )));
        }
        let product = products.get(&item.product_id).ok_or_else(|| {
            AppError::NotFound(format!("Product {} not found", item.product_id))
        })?;

        let wanted = requested.entry(item.product_id).or_insert(0);
        *wanted = wanted.saturating_add(item.quantity);
        if *wanted > product.quantity {
            return Err(AppError::InvalidArgument(format!(
                "Insufficient stock for product {}",
                product.title
            )));
        }
    }
    Ok(())
}

fn order_total(cart: &Cart, products: &ProductArena) -> AppResult<Decimal> {
    let out_of_range = || AppError::InvalidArgument("Order total is out of range".into());
    let total = cart.items.iter().try_fold(Decimal::ZERO, |total, item| {
        let price = products
            .get(&item.product_id)
            .map(|product| product.price)
            .ok_or_else(|| AppError::NotFound(format!("Product {} not found", item.product_id)))?;
        price
            .checked_mul(Decimal::from(item.quantity))
            .and_then(|line| total.checked_add(line))
            .ok_or_else(out_of_range)
    })?;

    if total > max_order_total() {
        return Err(out_of_range());
    }
    Ok(total)
}

fn snapshot_items(cart: &Cart, products: &ProductArena) -> AppResult<Vec<OrderItem>> {
    cart.items
        .iter()
        .map(|item| {
            let product = products.get(&item.product_id).ok_or_else(|| {
                AppError::NotFound(format!("Product {} not found", item.product_id))
            })?;
            Ok(OrderItem {
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: product.price,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::domain::{CartItem, Product};

    fn product(price: &str, quantity: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            title: "Test Product".into(),
            price: Decimal::from_str(price).unwrap(),
            quantity,
        }
    }

    fn cart_of(items: &[(&Product, i32)]) -> (Cart, ProductArena) {
        let mut cart = Cart::new(Uuid::new_v4());
        let mut arena = ProductArena::new();
        for (product, quantity) in items {
            cart.items.push(CartItem {
                product_id: product.id,
                quantity: *quantity,
            });
            arena.insert(product.id, (*product).clone());
        }
        (cart, arena)
    }

    #[test]
    fn total_uses_exact_decimal_arithmetic() {
        let phone = product("1000.00", 10);
        let case = product("0.33", 10);
        let (cart, arena) = cart_of(&[(&phone, 3), (&case, 2)]);

        let total = order_total(&cart, &arena).unwrap();
        assert_eq!(total, Decimal::from_str("3000.66").unwrap());
        assert_eq!(total.to_string(), "3000.66");
    }

    #[test]
    fn repeated_product_lines_are_checked_together() {
        let mug = product("5.00", 3);
        let (cart, arena) = cart_of(&[(&mug, 2), (&mug, 2)]);

        let err = ensure_stock(&cart, &arena).unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let mug = product("5.00", 3);
        let (cart, arena) = cart_of(&[(&mug, 0)]);

        assert!(matches!(
            ensure_stock(&cart, &arena),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn missing_product_is_not_found() {
        let mug = product("5.00", 3);
        let (cart, _) = cart_of(&[(&mug, 1)]);

        assert!(matches!(
            ensure_stock(&cart, &ProductArena::new()),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn total_is_bounded_by_stored_precision() {
        let at_limit = product("999999999999.99", 1);
        let (cart, arena) = cart_of(&[(&at_limit, 1)]);
        assert_eq!(order_total(&cart, &arena).unwrap(), max_order_total());

        let big = product("1000000.00", 1_000_000);
        let (cart, arena) = cart_of(&[(&big, 1_000_000)]);
        assert!(matches!(
            order_total(&cart, &arena),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn total_overflow_is_rejected() {
        let gold = product("79228162514264337593543950335", 10);
        let (cart, arena) = cart_of(&[(&gold, 2)]);

        assert!(matches!(
            order_total(&cart, &arena),
            Err(AppError::InvalidArgument(_))
        ));
    }
}
