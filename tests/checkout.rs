use std::str::FromStr;

use axum::{body::to_bytes, http::StatusCode};
use marketplace_api::{
    checkout::{self, CheckoutService, MemoryStorage},
    domain::{Cart, CartItem, OrderStatus, Product},
    error::AppError,
};
use rust_decimal::Decimal;
use uuid::Uuid;

fn decimal(value: &str) -> Decimal {
    Decimal::from_str(value).expect("decimal literal")
}

fn product(title: &str, price: &str, quantity: i32) -> Product {
    Product {
        id: Uuid::new_v4(),
        title: title.into(),
        price: decimal(price),
        quantity,
    }
}

fn cart_with(owner_id: Uuid, items: &[(&Product, i32)]) -> Cart {
    let mut cart = Cart::new(owner_id);
    cart.items = items
        .iter()
        .map(|(product, quantity)| CartItem {
            product_id: product.id,
            quantity: *quantity,
        })
        .collect();
    cart
}

async fn storage_with(products: &[&Product], cart: Option<Cart>) -> MemoryStorage {
    let storage = MemoryStorage::new();
    for product in products {
        storage.insert_product((*product).clone()).await;
    }
    if let Some(cart) = cart {
        storage.insert_cart(cart).await;
    }
    storage
}

#[tokio::test]
async fn checkout_creates_order_and_empties_cart() {
    let user_id = Uuid::parse_str("66a509ba-c8a9-43fc-b2b5-45ba3284788c").unwrap();
    let item = product("Test Product", "100.00", 10);
    let storage = storage_with(&[&item], Some(cart_with(user_id, &[(&item, 2)]))).await;
    let service = CheckoutService::new(storage.clone());

    let order = service.checkout(user_id).await.expect("checkout succeeds");

    assert_eq!(order.status, OrderStatus::Created);
    assert_eq!(order.total_price, decimal("200.00"));
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].product_id, item.id);
    assert_eq!(order.items[0].quantity, 2);
    assert_eq!(order.items[0].unit_price, decimal("100.00"));

    let stocked = storage.product(item.id).await.expect("product");
    assert_eq!(stocked.quantity, 8);
    let cart = storage.cart(user_id).await.expect("cart");
    assert!(cart.items.is_empty());

    let state = storage.snapshot().await;
    assert_eq!(state.order_saves, 1);
    assert_eq!(state.cart_saves, 1);
    assert_eq!(state.orders.len(), 1);
    assert_eq!(state.orders[0].owner_id, user_id);
    assert_eq!(state.orders[0].total_price, decimal("200.00"));
}

#[tokio::test]
async fn insufficient_stock_aborts_without_mutation() {
    let user_id = Uuid::new_v4();
    let phone = product("Iphone 15", "1000.00", 2);
    let cable = product("Cable", "10.00", 50);
    let storage = storage_with(
        &[&phone, &cable],
        Some(cart_with(user_id, &[(&cable, 1), (&phone, 5)])),
    )
    .await;
    let service = CheckoutService::new(storage.clone());

    let err = service.checkout(user_id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)), "got {err:?}");

    let state = storage.snapshot().await;
    assert_eq!(state.order_saves, 0);
    assert_eq!(state.cart_saves, 0);
    assert!(state.orders.is_empty());
    assert_eq!(storage.product(phone.id).await.map(|p| p.quantity), Some(2));
    assert_eq!(storage.product(cable.id).await.map(|p| p.quantity), Some(50));
    assert_eq!(state.carts[&user_id].items.len(), 2);
}

#[tokio::test]
async fn empty_cart_is_invalid_state() {
    let user_id = Uuid::new_v4();
    let storage = storage_with(&[], Some(Cart::new(user_id))).await;
    let service = CheckoutService::new(storage.clone());

    let err = service.checkout(user_id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)), "got {err:?}");
    assert_eq!(storage.snapshot().await.order_saves, 0);
}

#[tokio::test]
async fn missing_cart_is_not_found() {
    let storage = MemoryStorage::new();
    let service = CheckoutService::new(storage);

    let err = service.checkout(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn total_is_exact_decimal_sum() {
    let user_id = Uuid::new_v4();
    let laptop = product("Laptop", "1000.00", 5);
    let sticker = product("Sticker", "0.33", 5);
    let storage = storage_with(
        &[&laptop, &sticker],
        Some(cart_with(user_id, &[(&laptop, 3), (&sticker, 2)])),
    )
    .await;
    let service = CheckoutService::new(storage);

    let order = service.checkout(user_id).await.unwrap();
    assert_eq!(order.total_price, decimal("3000.66"));
    assert_eq!(order.total_price.to_string(), "3000.66");
}

#[tokio::test]
async fn order_items_do_not_follow_later_cart_changes() {
    let user_id = Uuid::new_v4();
    let mug = product("Ferris Mug", "12.00", 10);
    let storage = storage_with(&[&mug], Some(cart_with(user_id, &[(&mug, 3)]))).await;
    let service = CheckoutService::new(storage.clone());

    let view = service.checkout(user_id).await.unwrap();

    let mut cart = storage.cart(user_id).await.expect("cart kept");
    assert!(cart.items.is_empty());
    cart.items.push(CartItem {
        product_id: mug.id,
        quantity: 7,
    });
    storage.insert_cart(cart).await;

    let state = storage.snapshot().await;
    assert_eq!(state.orders[0].items.len(), 1);
    assert_eq!(state.orders[0].items[0].quantity, 3);
    assert_eq!(view.items[0].quantity, 3);
}

#[tokio::test]
async fn concurrent_checkouts_of_one_cart_create_one_order() {
    let user_id = Uuid::new_v4();
    let mug = product("Ferris Mug", "12.00", 10);
    let storage = storage_with(&[&mug], Some(cart_with(user_id, &[(&mug, 6)]))).await;
    let service = std::sync::Arc::new(CheckoutService::new(storage.clone()));

    let first = tokio::spawn({
        let service = service.clone();
        async move { service.checkout(user_id).await }
    });
    let second = tokio::spawn({
        let service = service.clone();
        async move { service.checkout(user_id).await }
    });
    let results = [first.await.unwrap(), second.await.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(AppError::InvalidState(_))))
    );

    let state = storage.snapshot().await;
    assert_eq!(state.orders.len(), 1);
    assert_eq!(storage.product(mug.id).await.map(|p| p.quantity), Some(4));
}

#[tokio::test]
async fn respond_renders_success_envelope() {
    let user_id = Uuid::new_v4();
    let mug = product("Ferris Mug", "12.50", 10);
    let storage = storage_with(&[&mug], Some(cart_with(user_id, &[(&mug, 2)]))).await;
    let service = CheckoutService::new(storage);

    let response = checkout::respond(&service, user_id).await;
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["message"], "Checkout success");
    assert_eq!(body["data"]["status"], "CREATED");
    assert_eq!(body["data"]["total_price"], "25.00");
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn respond_translates_failures() {
    let user_id = Uuid::new_v4();
    let storage = storage_with(&[], Some(Cart::new(user_id))).await;
    let service = CheckoutService::new(storage);

    let response = checkout::respond(&service, user_id).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "BAD_REQUEST");
    assert_eq!(body["message"], "Cart is empty");

    let response = checkout::respond(&service, Uuid::new_v4()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "NOT_FOUND");
}
