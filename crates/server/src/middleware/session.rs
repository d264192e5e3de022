//! Session middleware configuration.
//!
//! The session cookie is the carrier for both authenticated identity and the
//! guest wishlist token, so its lifetime matches the guest record window.
//! A shorter session would expire the token while the record was still live.

use sqlx::PgPool;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::ServerConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "wishlist_session";

fn expiry(config: &ServerConfig) -> Expiry {
    Expiry::OnInactivity(cookie::time::Duration::days(i64::from(
        config.wishlist.guest_expiry_days,
    )))
}

fn is_secure(config: &ServerConfig) -> bool {
    config.base_url.starts_with("https://")
}

/// Create the session layer with `PostgreSQL` store.
#[must_use]
pub fn postgres_session_layer(
    pool: &PgPool,
    config: &ServerConfig,
) -> SessionManagerLayer<PostgresStore> {
    let store = PostgresStore::new(pool.clone());

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(expiry(config))
        .with_secure(is_secure(config))
        .with_same_site(cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Create the session layer with in-process store (memory backend).
#[must_use]
pub fn memory_session_layer(config: &ServerConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(expiry(config))
        .with_secure(is_secure(config))
        .with_same_site(cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
