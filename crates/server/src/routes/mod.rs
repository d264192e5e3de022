//! HTTP route handlers for the wishlist service.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Health check (registered in main)
//!
//! # Wishlist
//! GET  /wishlist               - Wishlist page (embeds the AJAX nonce)
//! GET  /wishlist/count         - Count badge fragment
//! POST /wishlist/update        - Toggle/remove membership (AJAX)
//! POST /wishlist/add-to-cart   - Move item(s) to the cart (AJAX)
//! POST /wishlist/remove        - Remove an item, returns undo notice (AJAX)
//! GET  /add-to-wishlist        - Non-JS fallback (?add-to-wishlist=<id>)
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action (runs the wishlist merge)
//! POST /auth/logout            - Logout action
//! ```

pub mod auth;
pub mod wishlist;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::show))
        .route("/count", get(wishlist::count))
        .route("/update", post(wishlist::update))
        .route("/add-to-cart", post(wishlist::add_to_cart))
        .route("/remove", post(wishlist::remove))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create all routes for the wishlist service.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/wishlist", wishlist_routes())
        .route("/add-to-wishlist", get(wishlist::add_fallback))
        .nest("/auth", auth_routes())
}
