use std::str::FromStr;

use anyhow::Context;
use rust_decimal::Decimal;
use uuid::Uuid;

use marketplace_api::{
    db::{create_pool, create_orm_conn, run_migrations},
    middleware::auth::{ROLE_ADMIN, ROLE_USER},
    services::auth_service::hash_password,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,marketplace_api=debug".into()),
        )
        .init();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;
    let pool = create_pool(&database_url).await?;

    let admin_id = ensure_user(&pool, "admin@example.com", "admin12345", ROLE_ADMIN).await?;
    let user_id = ensure_user(&pool, "user@example.com", "user12345", ROLE_USER).await?;
    seed_products(&pool).await?;

    tracing::info!(%admin_id, %user_id, "seed completed");
    Ok(())
}

/// Upserts a user and makes sure it owns a cart.
async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO carts (id, owner_id)
        VALUES ($1, $2)
        ON CONFLICT (owner_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .execute(pool)
    .await?;

    tracing::info!(email, role, "ensured user");
    Ok(user_id)
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let products = [
        ("Axum Hoodie", "55.00", 50),
        ("Ferris Mug", "12.00", 100),
        ("Rust Sticker Pack", "5.00", 200),
        ("E-book: Async Rust", "25.00", 75),
    ];

    for (title, price, quantity) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, title, price, quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (title) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(Decimal::from_str(price)?)
        .bind(quantity)
        .execute(pool)
        .await?;
    }

    tracing::info!(count = products.len(), "seeded products");
    Ok(())
}
