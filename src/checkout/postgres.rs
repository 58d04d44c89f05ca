use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use uuid::Uuid;

use super::store::{CartStore, OrderStore, ProductStore, Storage, UnitOfWork};
use crate::{
    domain::{Cart, CartItem, Order, Product, ProductArena},
    entity::{
        cart_items::{ActiveModel as CartItemActive, Column as CartItemCol, Entity as CartItems},
        carts::{Column as CartCol, Entity as Carts},
        order_items::{ActiveModel as OrderItemActive, Entity as OrderItems},
        orders::ActiveModel as OrderActive,
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
};

/// Checkout stores backed by PostgreSQL through SeaORM.
#[derive(Clone)]
pub struct PgStorage {
    orm: DatabaseConnection,
}

impl PgStorage {
    pub fn new(orm: DatabaseConnection) -> Self {
        Self { orm }
    }
}

pub struct PgUnit {
    txn: DatabaseTransaction,
}

#[async_trait]
impl Storage for PgStorage {
    type Unit = PgUnit;

    async fn begin(&self) -> AppResult<PgUnit> {
        let txn = self.orm.begin().await?;
        Ok(PgUnit { txn })
    }
}

#[async_trait]
impl CartStore for PgUnit {
    async fn find_cart_by_owner(&mut self, owner_id: Uuid) -> AppResult<Option<Cart>> {
        let cart = Carts::find()
            .filter(CartCol::OwnerId.eq(owner_id))
            .lock(LockType::Update)
            .one(&self.txn)
            .await?;
        let Some(cart) = cart else {
            return Ok(None);
        };

        let items = CartItems::find()
            .filter(CartItemCol::CartId.eq(cart.id))
            .order_by_asc(CartItemCol::CreatedAt)
            .order_by_asc(CartItemCol::Id)
            .all(&self.txn)
            .await?
            .into_iter()
            .map(|row| CartItem {
                product_id: row.product_id,
                quantity: row.quantity,
            })
            .collect();

        Ok(Some(Cart {
            id: cart.id,
            owner_id: cart.owner_id,
            items,
        }))
    }

    async fn save_cart(&mut self, cart: Cart) -> AppResult<Cart> {
        CartItems::delete_many()
            .filter(CartItemCol::CartId.eq(cart.id))
            .exec(&self.txn)
            .await?;

        if !cart.items.is_empty() {
            let rows = cart.items.iter().map(|item| CartItemActive {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                created_at: NotSet,
            });
            CartItems::insert_many(rows).exec(&self.txn).await?;
        }

        Ok(cart)
    }
}

#[async_trait]
impl OrderStore for PgUnit {
    async fn save_order(&mut self, order: Order) -> AppResult<Order> {
        OrderActive {
            id: Set(order.id),
            user_id: Set(order.owner_id),
            status: Set(order.status.to_string()),
            total_price: Set(order.total_price),
            created_at: Set(order.created_at.into()),
        }
        .insert(&self.txn)
        .await?;

        let rows = order
            .items
            .iter()
            .enumerate()
            .map(|(position, item)| OrderItemActive {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                product_id: Set(item.product_id),
                position: Set(position as i32),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
            })
            .collect::<Vec<_>>();
        if !rows.is_empty() {
            OrderItems::insert_many(rows).exec(&self.txn).await?;
        }

        Ok(order)
    }
}

#[async_trait]
impl ProductStore for PgUnit {
    async fn find_products(&mut self, ids: &[Uuid]) -> AppResult<ProductArena> {
        if ids.is_empty() {
            return Ok(ProductArena::new());
        }

        // Rows are locked in id order.
        let rows = Products::find()
            .filter(ProdCol::Id.is_in(ids.to_vec()))
            .order_by_asc(ProdCol::Id)
            .lock(LockType::Update)
            .all(&self.txn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.id,
                    Product {
                        id: row.id,
                        title: row.title,
                        price: row.price,
                        quantity: row.quantity,
                    },
                )
            })
            .collect())
    }

    async fn decrement_stock(&mut self, product_id: Uuid, quantity: i32) -> AppResult<()> {
        let result = Products::update_many()
            .col_expr(ProdCol::Quantity, Expr::col(ProdCol::Quantity).sub(quantity))
            .filter(ProdCol::Id.eq(product_id))
            .filter(ProdCol::Quantity.gte(quantity))
            .exec(&self.txn)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::InvalidArgument(format!(
                "Insufficient stock for product {product_id}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for PgUnit {
    async fn commit(self) -> AppResult<()> {
        self.txn.commit().await?;
        Ok(())
    }
}
