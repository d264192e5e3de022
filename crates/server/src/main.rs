//! Wishlist Server - guest and user wishlists for the storefront.
//!
//! # Architecture
//!
//! - Axum web framework; server-rendered pages plus a JSON AJAX surface
//! - Askama templates for pages and HTML fragments
//! - `PostgreSQL` for durable user records and TTL-bounded guest records
//!   (or an in-process store with `WISHLIST_STORAGE=memory` for local work)
//! - tower-sessions carries the authenticated identity and the server-minted
//!   guest token
//! - The storefront cart is an external collaborator reached over HTTP

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use wishlist_core::{Email, UserId};
use wishlist_server::config::{ServerConfig, StorageBackend};
use wishlist_server::middleware::{memory_session_layer, postgres_session_layer};
use wishlist_server::services::cart::{CartGateway, HttpCartGateway, StubCartGateway};
use wishlist_server::services::catalog::{PgCatalog, StaticCatalog};
use wishlist_server::services::users::{MemoryUserStore, PgUserStore};
use wishlist_server::state::AppState;
use wishlist_server::store::{MemoryWishlistStore, PgWishlistStore};
use wishlist_server::{db, routes};

use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired guest records are swept from postgres.
const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60 * 60);

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ServerConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn cart_gateway(config: &ServerConfig) -> Arc<dyn CartGateway> {
    match config.cart_service_url.as_deref() {
        Some(url) => Arc::new(HttpCartGateway::new(url)),
        None => {
            tracing::warn!("CART_SERVICE_URL not set; cart adds will be accepted locally");
            Arc::new(StubCartGateway::default())
        }
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = ServerConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Initialize tracing with EnvFilter and Sentry integration
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "wishlist_server=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let app = match config.storage {
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .clone()
                .expect("postgres backend requires WISHLIST_DATABASE_URL");
            let pool = db::create_pool(&database_url)
                .await
                .expect("Failed to create database pool");
            tracing::info!("Database pool created");

            // NOTE: Schema migrations are NOT run automatically on startup.
            // Run them explicitly via: cargo run -p wishlist-cli -- migrate

            let session_layer = postgres_session_layer(&pool, &config);

            let store = PgWishlistStore::new(pool.clone(), config.wishlist.guest_ttl());
            store.spawn_sweeper(SWEEP_INTERVAL);

            let state = AppState::new(
                config.clone(),
                Arc::new(store),
                Arc::new(PgCatalog::new(pool.clone())),
                cart_gateway(&config),
                Arc::new(PgUserStore::new(pool)),
            );

            routes::routes()
                .route("/health", get(health))
                .layer(session_layer)
                .with_state(state)
        }
        StorageBackend::Memory => {
            tracing::warn!("memory backend selected; state is lost on restart");

            let users = MemoryUserStore::new()
                .with_user(
                    UserId::new(1),
                    Email::parse("demo@example.com").expect("static demo email"),
                    "demo-password",
                )
                .expect("Failed to seed demo user");

            let state = AppState::new(
                config.clone(),
                Arc::new(MemoryWishlistStore::new(config.wishlist.guest_ttl())),
                Arc::new(StaticCatalog::demo()),
                cart_gateway(&config),
                Arc::new(users),
            );

            routes::routes()
                .route("/health", get(health))
                .layer(memory_session_layer(&config))
                .with_state(state)
        }
    };

    let app: Router = app
        .layer(TraceLayer::new_for_http())
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    // Start server
    let addr = config.socket_addr();
    tracing::info!("wishlist server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
