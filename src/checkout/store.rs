use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    domain::{Cart, Order, ProductArena},
    error::AppResult,
};

#[async_trait]
pub trait CartStore: Send {
    /// Loads the owner's cart with its items, locking it for the rest of the unit of work.
    async fn find_cart_by_owner(&mut self, owner_id: Uuid) -> AppResult<Option<Cart>>;

    /// Replaces the stored items of the cart with `cart.items`.
    async fn save_cart(&mut self, cart: Cart) -> AppResult<Cart>;
}

#[async_trait]
pub trait OrderStore: Send {
    async fn save_order(&mut self, order: Order) -> AppResult<Order>;
}

#[async_trait]
pub trait ProductStore: Send {
    /// Loads and locks the given products. Unknown ids are simply absent from the result.
    async fn find_products(&mut self, ids: &[Uuid]) -> AppResult<ProductArena>;

    /// Lowers stock by `quantity`; fails with `InvalidArgument` instead of going negative.
    async fn decrement_stock(&mut self, product_id: Uuid, quantity: i32) -> AppResult<()>;
}

/// One transactional scope over the stores.
///
/// Dropping a unit without calling [`UnitOfWork::commit`] discards every write made through it.
#[async_trait]
pub trait UnitOfWork: CartStore + OrderStore + ProductStore + Send {
    async fn commit(self) -> AppResult<()>;
}

#[async_trait]
pub trait Storage: Send + Sync {
    type Unit: UnitOfWork;

    async fn begin(&self) -> AppResult<Self::Unit>;
}
