//! Seed the database with demo products and a demo user.
//!
//! Intended for development databases; every statement is conflict-safe so
//! re-running is harmless.

use secrecy::SecretString;
use sqlx::PgPool;

use wishlist_core::Email;
use wishlist_server::services::users::hash_password;

/// Errors that can occur while seeding.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] wishlist_core::EmailError),

    #[error("Password hashing error: {0}")]
    Password(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

const DEMO_PRODUCTS: &[(&str, &str, i64, bool)] = &[
    ("Canvas Tote", "canvas-tote", 2400, true),
    ("Enamel Mug", "enamel-mug", 1800, true),
    ("Wool Blanket", "wool-blanket", 9500, true),
    ("Field Notebook", "field-notebook", 900, false),
];

/// Seed demo products and a demo user.
///
/// # Errors
///
/// Returns [`SeedError`] if the database is unreachable, the email is
/// invalid, or hashing fails.
pub async fn run(email: &str, password: &str) -> Result<(), SeedError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("WISHLIST_DATABASE_URL")
        .map_err(|_| SeedError::MissingEnvVar("WISHLIST_DATABASE_URL"))?;
    let email = Email::parse(email)?;
    let password_hash = hash_password(password).map_err(|e| SeedError::Password(e.to_string()))?;

    let pool: PgPool = wishlist_server::db::create_pool(&SecretString::from(database_url)).await?;

    for (title, slug, price_cents, in_stock) in DEMO_PRODUCTS {
        sqlx::query(
            "INSERT INTO products (title, slug, price_cents, in_stock, purchasable)
             VALUES ($1, $2, $3, $4, $4)
             ON CONFLICT (slug) DO NOTHING",
        )
        .bind(title)
        .bind(slug)
        .bind(price_cents)
        .bind(in_stock)
        .execute(&pool)
        .await?;
    }
    tracing::info!("Seeded {} demo products", DEMO_PRODUCTS.len());

    let inserted = sqlx::query(
        "INSERT INTO users (email, password_hash)
         VALUES ($1, $2)
         ON CONFLICT (email) DO NOTHING",
    )
    .bind(email.as_str())
    .bind(&password_hash)
    .execute(&pool)
    .await?;

    if inserted.rows_affected() > 0 {
        tracing::info!(email = %email, "Seeded demo user");
    } else {
        tracing::info!(email = %email, "Demo user already present");
    }

    Ok(())
}
