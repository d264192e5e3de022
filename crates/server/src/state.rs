//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::services::cart::CartGateway;
use crate::services::catalog::Catalog;
use crate::services::users::UserStore;
use crate::services::wishlist::{WishlistPolicy, WishlistService};
use crate::store::WishlistStore;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. The concrete storage and gateway
/// implementations are chosen at startup from the configured backend.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    store: Arc<dyn WishlistStore>,
    wishlist: WishlistService,
    catalog: Arc<dyn Catalog>,
    cart: Arc<dyn CartGateway>,
    users: Arc<dyn UserStore>,
}

impl AppState {
    /// Assemble application state from a configuration and backends.
    #[must_use]
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn WishlistStore>,
        catalog: Arc<dyn Catalog>,
        cart: Arc<dyn CartGateway>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        let wishlist = WishlistService::new(
            Arc::clone(&store),
            WishlistPolicy {
                remove_on_second_click: config.wishlist.remove_on_second_click,
                remove_if_added_to_cart: config.wishlist.remove_if_added_to_cart,
            },
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                wishlist,
                catalog,
                cart,
                users,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the wishlist store.
    ///
    /// Handlers only read through this; writes go through the service.
    #[must_use]
    pub fn store(&self) -> &dyn WishlistStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the wishlist mutation service.
    #[must_use]
    pub fn wishlist(&self) -> &WishlistService {
        &self.inner.wishlist
    }

    /// Get a reference to the product catalog.
    #[must_use]
    pub fn catalog(&self) -> &dyn Catalog {
        self.inner.catalog.as_ref()
    }

    /// Get a reference to the cart gateway.
    #[must_use]
    pub fn cart(&self) -> &dyn CartGateway {
        self.inner.cart.as_ref()
    }

    /// Get a reference to the user store.
    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.inner.users.as_ref()
    }
}
