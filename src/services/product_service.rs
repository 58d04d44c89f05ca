use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set, SqlErr};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit::{self, AuditEntry},
    domain::max_unit_price,
    dto::products::{CreateProductRequest, ProductList},
    entity::products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_products(state: &AppState) -> AppResult<ApiResponse<ProductList>> {
    let items: Vec<Product> = Products::find()
        .order_by_asc(Column::Title)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let meta = Meta::total(items.len());
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(product_from_entity)
        .ok_or_else(|| AppError::NotFound(format!("Product {id} not found")))?;
    Ok(ApiResponse::success("Product", product, None))
}

pub fn validate_new_product(payload: &CreateProductRequest) -> AppResult<()> {
    if payload.title.trim().is_empty() {
        return Err(AppError::InvalidArgument("title must not be empty".into()));
    }
    if payload.price < Decimal::ZERO {
        return Err(AppError::InvalidArgument("price must not be negative".into()));
    }
    if payload.price > max_unit_price() {
        return Err(AppError::InvalidArgument(format!(
            "price must not exceed {}",
            max_unit_price()
        )));
    }
    if payload.price.scale() > 2 {
        return Err(AppError::InvalidArgument(
            "price must have at most two decimal places".into(),
        ));
    }
    if payload.quantity < 0 {
        return Err(AppError::InvalidArgument("quantity must not be negative".into()));
    }
    Ok(())
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    validate_new_product(&payload)?;

    let product = ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(payload.title.trim().to_string()),
        price: Set(payload.price),
        quantity: Set(payload.quantity),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::InvalidArgument("A product with this title already exists".into())
        }
        _ => err.into(),
    })?;

    audit::record(
        &state.pool,
        AuditEntry::new(
            user.user_id,
            "product_create",
            "products",
            serde_json::json!({ "product_id": product.id }),
        ),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub(crate) fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        title: model.title,
        price: model.price,
        quantity: model.quantity,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
