use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use marketplace_api::{
    routes::{self, health::health_check, not_found},
    state::AppState,
};
use sea_orm::DatabaseConnection;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

fn offline_app() -> Router {
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/marketplace")
        .expect("lazy pool");
    routes::app(AppState::new(pool, DatabaseConnection::Disconnected, "secret"))
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_check_returns_ok() {
    let response = health_check().await;
    assert_eq!(response.0.message, "Health check");

    let data = response.0.data.expect("health data");
    assert_eq!(data.status, "ok");
}

#[tokio::test]
async fn unknown_route_is_translated_to_not_found() {
    let app = Router::new().fallback(not_found);

    let response = app
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(body["message"], "No route for /nope");
}

#[tokio::test]
async fn wrong_method_is_translated_to_bad_request() {
    let response = offline_app()
        .oneshot(
            Request::get("/api/orders/checkout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["code"], "BAD_REQUEST");
    assert_eq!(
        body["message"],
        "Method GET is not allowed for /api/orders/checkout"
    );
}

#[tokio::test]
async fn oversized_body_is_translated_to_bad_request() {
    let padding = "a".repeat(2 * 1024 * 1024);
    let payload = format!(r#"{{"email":"{padding}@example.com","password":"hunter2hunter2"}}"#);

    let response = offline_app()
        .oneshot(
            Request::post("/api/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["code"], "BAD_REQUEST");
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("length limit exceeded")
    );
}
