use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use marketplace_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(&pool, "admin@example.com", "admin123", "admin").await?;
    let manager_id = ensure_user(
        &pool,
        "manager@example.com",
        "manager123",
        "tourism-manager",
    )
    .await?;
    let buyer_id = ensure_user(&pool, "buyer@example.com", "buyer123", "user").await?;

    let store_id = ensure_store(&pool, manager_id, "Bali Tours", "bali-tours").await?;
    seed_products(&pool, store_id).await?;
    seed_settings(&pool).await?;

    println!("Seed completed. Admin: {admin_id}, Manager: {manager_id}, Buyer: {buyer_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

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

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn ensure_store(
    pool: &sqlx::PgPool,
    user_id: Uuid,
    name: &str,
    slug: &str,
) -> anyhow::Result<Uuid> {
    let (store_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO stores (id, user_id, name, slug, description)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(name)
    .bind(slug)
    .bind("Island day trips and attraction tickets")
    .fetch_one(pool)
    .await?;

    println!("Ensured store {slug}");
    Ok(store_id)
}

async fn seed_products(pool: &sqlx::PgPool, store_id: Uuid) -> anyhow::Result<()> {
    let products: Vec<(&str, &str, i64, i32, Option<&str>)> = vec![
        ("City Tour Ticket", "Full-day guided city tour", 150000, 40, Some("ticket")),
        ("Waterfall Trek Ticket", "Morning trek with a guide", 200000, 25, Some("ticket")),
        ("Canvas Tote Bag", "Hand-printed souvenir tote", 85000, 120, None),
        ("Coffee Sampler", "Three single-origin packs", 120000, 60, None),
    ];

    for (name, desc, price, stock, product_type) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, store_id, name, description, price, stock, product_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(store_id)
        .bind(name)
        .bind(desc)
        .bind(price)
        .bind(stock)
        .bind(product_type)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}

async fn seed_settings(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    for (key, value) in [("service_fee_percentage", "5"), ("buyer_service_fee", "2000")] {
        sqlx::query(
            r#"
            INSERT INTO system_settings (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;
    }

    println!("Seeded fee settings");
    Ok(())
}
