//! `PostgreSQL` wishlist storage.
//!
//! User records live in `wishlist_items`, guest records in
//! `guest_wishlist_items` with an `expires_at` column. Membership changes are
//! single-statement upserts/deletes; the read-modify-write pattern never
//! appears here.
//!
//! Expired guest rows are invisible to reads and purged lazily on guest
//! writes; [`PgWishlistStore::spawn_sweeper`] additionally deletes them in
//! the background so abandoned records do not accumulate.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use wishlist_core::{GuestToken, ProductId, UserId, WishlistIdentity};

use super::{StoreError, WishlistStore};

/// `PostgreSQL`-backed wishlist store.
#[derive(Clone)]
pub struct PgWishlistStore {
    pool: PgPool,
    guest_ttl: Duration,
}

impl PgWishlistStore {
    /// Create a new store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool, guest_ttl: Duration) -> Self {
        Self { pool, guest_ttl }
    }

    /// Spawn a background task that periodically deletes expired guest rows.
    pub fn spawn_sweeper(&self, every: Duration) {
        let pool = self.pool.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                match sqlx::query("DELETE FROM guest_wishlist_items WHERE expires_at <= now()")
                    .execute(&pool)
                    .await
                {
                    Ok(result) if result.rows_affected() > 0 => {
                        tracing::debug!(
                            rows = result.rows_affected(),
                            "swept expired guest wishlist rows"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!("guest wishlist sweep failed: {e}"),
                }
            }
        });
    }

    fn fresh_deadline(&self) -> DateTime<Utc> {
        Utc::now()
            + chrono::Duration::from_std(self.guest_ttl)
                .unwrap_or_else(|_| chrono::Duration::days(30))
    }

    /// Drop expired rows for a token so a conflict during insert can only be
    /// with a live row.
    async fn purge_expired<'e, E>(executor: E, token: &GuestToken) -> Result<(), StoreError>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query("DELETE FROM guest_wishlist_items WHERE token = $1 AND expires_at <= now()")
            .bind(token.as_str())
            .execute(executor)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl WishlistStore for PgWishlistStore {
    async fn product_ids(&self, identity: &WishlistIdentity) -> Result<Vec<ProductId>, StoreError> {
        let ids = match identity {
            WishlistIdentity::User(user) => {
                sqlx::query_scalar::<_, ProductId>(
                    "SELECT product_id FROM wishlist_items
                     WHERE user_id = $1
                     ORDER BY added_at, product_id",
                )
                .bind(*user)
                .fetch_all(&self.pool)
                .await?
            }
            WishlistIdentity::Guest(token) => {
                sqlx::query_scalar::<_, ProductId>(
                    "SELECT product_id FROM guest_wishlist_items
                     WHERE token = $1 AND expires_at > now()
                     ORDER BY added_at, product_id",
                )
                .bind(token.as_str())
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(ids)
    }

    async fn contains(
        &self,
        identity: &WishlistIdentity,
        product: ProductId,
    ) -> Result<bool, StoreError> {
        let present = match identity {
            WishlistIdentity::User(user) => {
                sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS(
                         SELECT 1 FROM wishlist_items
                         WHERE user_id = $1 AND product_id = $2
                     )",
                )
                .bind(*user)
                .bind(product)
                .fetch_one(&self.pool)
                .await?
            }
            WishlistIdentity::Guest(token) => {
                sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS(
                         SELECT 1 FROM guest_wishlist_items
                         WHERE token = $1 AND product_id = $2 AND expires_at > now()
                     )",
                )
                .bind(token.as_str())
                .bind(product)
                .fetch_one(&self.pool)
                .await?
            }
        };
        Ok(present)
    }

    async fn add(
        &self,
        identity: &WishlistIdentity,
        product: ProductId,
    ) -> Result<bool, StoreError> {
        match identity {
            WishlistIdentity::User(user) => {
                let result = sqlx::query(
                    "INSERT INTO wishlist_items (user_id, product_id)
                     VALUES ($1, $2)
                     ON CONFLICT DO NOTHING",
                )
                .bind(*user)
                .bind(product)
                .execute(&self.pool)
                .await?;
                Ok(result.rows_affected() > 0)
            }
            WishlistIdentity::Guest(token) => {
                let mut tx = self.pool.begin().await?;
                Self::purge_expired(&mut *tx, token).await?;

                let result = sqlx::query(
                    "INSERT INTO guest_wishlist_items (token, product_id, expires_at)
                     VALUES ($1, $2, $3)
                     ON CONFLICT (token, product_id) DO NOTHING",
                )
                .bind(token.as_str())
                .bind(product)
                .bind(self.fresh_deadline())
                .execute(&mut *tx)
                .await?;

                // Every write slides the whole record's TTL forward.
                sqlx::query("UPDATE guest_wishlist_items SET expires_at = $2 WHERE token = $1")
                    .bind(token.as_str())
                    .bind(self.fresh_deadline())
                    .execute(&mut *tx)
                    .await?;

                tx.commit().await?;
                Ok(result.rows_affected() > 0)
            }
        }
    }

    async fn remove(
        &self,
        identity: &WishlistIdentity,
        product: ProductId,
    ) -> Result<bool, StoreError> {
        match identity {
            WishlistIdentity::User(user) => {
                let result = sqlx::query(
                    "DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2",
                )
                .bind(*user)
                .bind(product)
                .execute(&self.pool)
                .await?;
                Ok(result.rows_affected() > 0)
            }
            WishlistIdentity::Guest(token) => {
                let mut tx = self.pool.begin().await?;
                Self::purge_expired(&mut *tx, token).await?;

                let result = sqlx::query(
                    "DELETE FROM guest_wishlist_items WHERE token = $1 AND product_id = $2",
                )
                .bind(token.as_str())
                .bind(product)
                .execute(&mut *tx)
                .await?;

                sqlx::query("UPDATE guest_wishlist_items SET expires_at = $2 WHERE token = $1")
                    .bind(token.as_str())
                    .bind(self.fresh_deadline())
                    .execute(&mut *tx)
                    .await?;

                tx.commit().await?;
                Ok(result.rows_affected() > 0)
            }
        }
    }

    async fn clear_guest(&self, token: &GuestToken) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM guest_wishlist_items WHERE token = $1")
            .bind(token.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn merge_guest_into_user(
        &self,
        user: UserId,
        token: &GuestToken,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO wishlist_items (user_id, product_id, added_at)
             SELECT $1, product_id, added_at
             FROM guest_wishlist_items
             WHERE token = $2 AND expires_at > now()
             ON CONFLICT DO NOTHING",
        )
        .bind(user)
        .bind(token.as_str())
        .execute(&mut *tx)
        .await?;

        // The guest record must not linger past login.
        sqlx::query("DELETE FROM guest_wishlist_items WHERE token = $1")
            .bind(token.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn guest_expires_in(&self, token: &GuestToken) -> Result<Option<Duration>, StoreError> {
        let deadline: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT max(expires_at) FROM guest_wishlist_items
             WHERE token = $1 AND expires_at > now()",
        )
        .bind(token.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(deadline
            .and_then(|d| (d - Utc::now()).to_std().ok())
            .filter(|d| !d.is_zero()))
    }
}
