//! Wishlist record storage.
//!
//! A record is the set of product IDs associated with one identity. User
//! records are durable; guest records carry a TTL that is refreshed on every
//! write and enforced entirely here; callers never see an "expired" error,
//! only an empty record.
//!
//! The trait exposes atomic membership operations rather than whole-record
//! read/write, so concurrent mutations against the same identity cannot
//! silently discard each other.

mod memory;
mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use wishlist_core::{GuestToken, ProductId, UserId, WishlistIdentity};

pub use memory::MemoryWishlistStore;
pub use postgres::PgWishlistStore;

/// Errors surfaced by wishlist storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Backend-agnostic wishlist record storage.
#[async_trait]
pub trait WishlistStore: Send + Sync {
    /// All product IDs in the identity's record, in insertion order.
    ///
    /// A missing or expired record reads as empty.
    async fn product_ids(&self, identity: &WishlistIdentity) -> Result<Vec<ProductId>, StoreError>;

    /// Whether the product is in the identity's record.
    async fn contains(
        &self,
        identity: &WishlistIdentity,
        product: ProductId,
    ) -> Result<bool, StoreError> {
        Ok(self.product_ids(identity).await?.contains(&product))
    }

    /// Insert the product if absent. Returns whether it was newly inserted.
    ///
    /// Always refreshes the guest TTL, even when the product was already
    /// present.
    async fn add(
        &self,
        identity: &WishlistIdentity,
        product: ProductId,
    ) -> Result<bool, StoreError>;

    /// Remove the product if present. Returns whether it was present.
    ///
    /// Refreshes the guest TTL of the surviving record.
    async fn remove(
        &self,
        identity: &WishlistIdentity,
        product: ProductId,
    ) -> Result<bool, StoreError>;

    /// Delete a guest record unconditionally.
    async fn clear_guest(&self, token: &GuestToken) -> Result<(), StoreError>;

    /// Union the guest record into the user's durable record, deduplicating,
    /// then delete the guest record unconditionally, even when the guest
    /// record was empty or expired.
    async fn merge_guest_into_user(
        &self,
        user: UserId,
        token: &GuestToken,
    ) -> Result<(), StoreError>;

    /// Time until the guest record expires, if one exists.
    async fn guest_expires_in(&self, token: &GuestToken) -> Result<Option<Duration>, StoreError>;
}
