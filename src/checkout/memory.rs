//! In-process storage for the checkout stores.
//!
//! A unit of work holds the storage lock from `begin` until it is committed or
//! dropped, so checkouts against a `MemoryStorage` run one at a time. Writes go
//! to a staged copy of the state and replace the shared state on commit.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::store::{CartStore, OrderStore, ProductStore, Storage, UnitOfWork};
use crate::{
    domain::{Cart, Order, Product, ProductArena},
    error::{AppError, AppResult},
};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub products: HashMap<Uuid, Product>,
    /// Carts keyed by owner id.
    pub carts: HashMap<Uuid, Cart>,
    pub orders: Vec<Order>,
    pub cart_saves: usize,
    pub order_saves: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_product(&self, product: Product) {
        self.state.lock().await.products.insert(product.id, product);
    }

    pub async fn insert_cart(&self, cart: Cart) {
        self.state.lock().await.carts.insert(cart.owner_id, cart);
    }

    pub async fn product(&self, id: Uuid) -> Option<Product> {
        self.state.lock().await.products.get(&id).cloned()
    }

    pub async fn cart(&self, owner_id: Uuid) -> Option<Cart> {
        self.state.lock().await.carts.get(&owner_id).cloned()
    }

    /// Copy of the committed state.
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }
}

pub struct MemoryUnit {
    committed: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl Storage for MemoryStorage {
    type Unit = MemoryUnit;

    async fn begin(&self) -> AppResult<MemoryUnit> {
        let committed = self.state.clone().lock_owned().await;
        let staged = committed.clone();
        Ok(MemoryUnit { committed, staged })
    }
}

#[async_trait]
impl CartStore for MemoryUnit {
    async fn find_cart_by_owner(&mut self, owner_id: Uuid) -> AppResult<Option<Cart>> {
        Ok(self.staged.carts.get(&owner_id).cloned())
    }

    async fn save_cart(&mut self, cart: Cart) -> AppResult<Cart> {
        self.staged.cart_saves += 1;
        self.staged.carts.insert(cart.owner_id, cart.clone());
        Ok(cart)
    }
}

#[async_trait]
impl OrderStore for MemoryUnit {
    async fn save_order(&mut self, order: Order) -> AppResult<Order> {
        self.staged.order_saves += 1;
        self.staged.orders.push(order.clone());
        Ok(order)
    }
}

#[async_trait]
impl ProductStore for MemoryUnit {
    async fn find_products(&mut self, ids: &[Uuid]) -> AppResult<ProductArena> {
        Ok(ids
            .iter()
            .filter_map(|id| self.staged.products.get(id).map(|p| (*id, p.clone())))
            .collect())
    }

    async fn decrement_stock(&mut self, product_id: Uuid, quantity: i32) -> AppResult<()> {
        let product = self
            .staged
            .products
            .get_mut(&product_id)
            .ok_or_else(|| AppError::NotFound(format!("Product {product_id} not found")))?;
        if product.quantity < quantity {
            return Err(AppError::InvalidArgument(format!(
                "Insufficient stock for product {}",
                product.title
            )));
        }
        product.quantity -= quantity;
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnit {
    async fn commit(mut self) -> AppResult<()> {
        *self.committed = std::mem::take(&mut self.staged);
        Ok(())
    }
}
