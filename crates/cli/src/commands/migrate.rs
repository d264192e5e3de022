//! Database migration command.
//!
//! # Environment Variables
//!
//! - `WISHLIST_DATABASE_URL` - `PostgreSQL` connection string
//!
//! Migration files live in `crates/server/migrations/`.

use secrecy::SecretString;
use sqlx::PgPool;

/// Errors that can occur while migrating.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run wishlist database migrations.
///
/// # Errors
///
/// Returns [`MigrationError`] if the database is unreachable or a migration
/// fails.
pub async fn run() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("WISHLIST_DATABASE_URL")
        .map_err(|_| MigrationError::MissingEnvVar("WISHLIST_DATABASE_URL"))?;

    tracing::info!("Connecting to wishlist database...");
    let pool: PgPool = wishlist_server::db::create_pool(&SecretString::from(database_url)).await?;

    tracing::info!("Running wishlist migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Wishlist migrations complete!");
    Ok(())
}
