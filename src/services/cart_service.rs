use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::OnConflict;
use uuid::Uuid;

use crate::{
    audit::{self, AuditEntry},
    dto::cart::{AddToCartRequest, CartView},
    entity::{
        cart_items::{
            ActiveModel as CartItemActive, Column as CartItemCol, Entity as CartItems,
            Model as CartItemModel,
        },
        carts::{ActiveModel as CartActive, Column as CartCol, Entity as Carts, Model as CartModel},
        products::Entity as Products,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::CartItem,
    response::{ApiResponse, Meta},
    services::product_service::product_from_entity,
    state::AppState,
};

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let cart = Carts::find()
        .filter(CartCol::OwnerId.eq(user.user_id))
        .one(&state.orm)
        .await?;

    let items: Vec<CartItem> = match cart {
        Some(cart) => CartItems::find()
            .filter(CartItemCol::CartId.eq(cart.id))
            .order_by_asc(CartItemCol::CreatedAt)
            .find_also_related(Products)
            .all(&state.orm)
            .await?
            .into_iter()
            .filter_map(|(item, product)| {
                product.map(|product| CartItem {
                    product: product_from_entity(product),
                    quantity: item.quantity,
                })
            })
            .collect(),
        None => Vec::new(),
    };

    let meta = Meta::total(items.len());
    Ok(ApiResponse::success(
        "OK",
        CartView {
            owner_id: user.user_id,
            items,
        },
        Some(meta),
    ))
}

/// Sets the quantity of a product in the caller's cart, adding the line if needed.
pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::InvalidArgument(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let txn = state.orm.begin().await?;

    let product = Products::find_by_id(payload.product_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {} not found", payload.product_id)))?;

    let cart = ensure_cart(&txn, user.user_id).await?;
    let item = upsert_item(&txn, cart.id, product.id, payload.quantity).await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        AuditEntry::new(
            user.user_id,
            "cart_update",
            "cart_items",
            serde_json::json!({ "product_id": product.id, "quantity": item.quantity }),
        ),
    )
    .await;

    Ok(ApiResponse::success(
        "OK",
        CartItem {
            product: product_from_entity(product),
            quantity: item.quantity,
        },
        Some(Meta::empty()),
    ))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let cart = Carts::find()
        .filter(CartCol::OwnerId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Cart not found".into()))?;

    let result = CartItems::delete_many()
        .filter(CartItemCol::CartId.eq(cart.id))
        .filter(CartItemCol::ProductId.eq(product_id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!(
            "Product {product_id} is not in the cart"
        )));
    }

    audit::record(
        &state.pool,
        AuditEntry::new(
            user.user_id,
            "cart_remove",
            "cart_items",
            serde_json::json!({ "product_id": product_id }),
        ),
    )
    .await;

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Inserts the cart line or overwrites its quantity when the product is already in the cart.
async fn upsert_item<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<CartItemModel> {
    CartItems::insert(CartItemActive {
        id: Set(Uuid::new_v4()),
        cart_id: Set(cart_id),
        product_id: Set(product_id),
        quantity: Set(quantity),
        created_at: NotSet,
    })
    .on_conflict(
        OnConflict::columns([CartItemCol::CartId, CartItemCol::ProductId])
            .update_column(CartItemCol::Quantity)
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;

    CartItems::find()
        .filter(CartItemCol::CartId.eq(cart_id))
        .filter(CartItemCol::ProductId.eq(product_id))
        .one(conn)
        .await?
        .ok_or_else(|| {
            AppError::Unexpected(anyhow::anyhow!("cart line for {product_id} vanished"))
        })
}

/// Returns the owner's cart, creating it on first use.
async fn ensure_cart<C: ConnectionTrait>(conn: &C, owner_id: Uuid) -> AppResult<CartModel> {
    Carts::insert(CartActive {
        id: Set(Uuid::new_v4()),
        owner_id: Set(owner_id),
        created_at: NotSet,
    })
    .on_conflict(OnConflict::column(CartCol::OwnerId).do_nothing().to_owned())
    .exec_without_returning(conn)
    .await?;

    Carts::find()
        .filter(CartCol::OwnerId.eq(owner_id))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::Unexpected(anyhow::anyhow!("cart for {owner_id} vanished")))
}
