//! In-process wishlist storage.
//!
//! Used for local development without a database, and by tests. Guest
//! records carry a `tokio::time::Instant` deadline, so paused-clock tests
//! can drive expiry deterministically. Expiry is enforced lazily: reads and
//! writes treat a past-deadline record as absent.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use wishlist_core::{GuestToken, ProductId, UserId, WishlistIdentity};

use super::{StoreError, WishlistStore};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
    User(UserId),
    Guest(String),
}

impl Key {
    fn from_identity(identity: &WishlistIdentity) -> Self {
        match identity {
            WishlistIdentity::User(user) => Self::User(*user),
            WishlistIdentity::Guest(token) => Self::Guest(token.as_str().to_owned()),
        }
    }
}

#[derive(Debug)]
struct Record {
    /// Insertion-ordered, duplicate-free.
    ids: Vec<ProductId>,
    /// `None` for durable user records.
    deadline: Option<Instant>,
}

impl Record {
    fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| d <= Instant::now())
    }
}

/// In-memory wishlist store.
#[derive(Debug)]
pub struct MemoryWishlistStore {
    guest_ttl: Duration,
    records: Mutex<HashMap<Key, Record>>,
}

impl MemoryWishlistStore {
    /// Create an empty store with the given guest TTL.
    #[must_use]
    pub fn new(guest_ttl: Duration) -> Self {
        Self {
            guest_ttl,
            records: Mutex::new(HashMap::new()),
        }
    }

    fn with_records<T>(&self, f: impl FnOnce(&mut HashMap<Key, Record>) -> T) -> T {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut records)
    }

    /// Drop the record if its deadline has passed, then hand back a live
    /// entry (if any) to the closure.
    fn with_live_record<T>(&self, key: &Key, f: impl FnOnce(Option<&mut Record>) -> T) -> T {
        self.with_records(|records| {
            if records.get(key).is_some_and(Record::expired) {
                records.remove(key);
            }
            f(records.get_mut(key))
        })
    }
}

#[async_trait]
impl WishlistStore for MemoryWishlistStore {
    async fn product_ids(&self, identity: &WishlistIdentity) -> Result<Vec<ProductId>, StoreError> {
        let key = Key::from_identity(identity);
        Ok(self.with_live_record(&key, |record| {
            record.map(|r| r.ids.clone()).unwrap_or_default()
        }))
    }

    async fn add(
        &self,
        identity: &WishlistIdentity,
        product: ProductId,
    ) -> Result<bool, StoreError> {
        let key = Key::from_identity(identity);
        let deadline = identity
            .is_guest()
            .then(|| Instant::now() + self.guest_ttl);

        Ok(self.with_records(|records| {
            if records.get(&key).is_some_and(Record::expired) {
                records.remove(&key);
            }
            let record = records.entry(key).or_insert(Record {
                ids: Vec::new(),
                deadline,
            });
            record.deadline = deadline;

            if record.ids.contains(&product) {
                false
            } else {
                record.ids.push(product);
                true
            }
        }))
    }

    async fn remove(
        &self,
        identity: &WishlistIdentity,
        product: ProductId,
    ) -> Result<bool, StoreError> {
        let key = Key::from_identity(identity);
        let deadline = identity
            .is_guest()
            .then(|| Instant::now() + self.guest_ttl);

        Ok(self.with_live_record(&key, |record| {
            let Some(record) = record else {
                return false;
            };
            record.deadline = deadline.or(record.deadline);
            let before = record.ids.len();
            record.ids.retain(|id| *id != product);
            record.ids.len() != before
        }))
    }

    async fn clear_guest(&self, token: &GuestToken) -> Result<(), StoreError> {
        let key = Key::Guest(token.as_str().to_owned());
        self.with_records(|records| {
            records.remove(&key);
        });
        Ok(())
    }

    async fn merge_guest_into_user(
        &self,
        user: UserId,
        token: &GuestToken,
    ) -> Result<(), StoreError> {
        let guest_key = Key::Guest(token.as_str().to_owned());
        let user_key = Key::User(user);

        self.with_records(|records| {
            let guest_ids = match records.remove(&guest_key) {
                Some(record) if !record.expired() => record.ids,
                _ => Vec::new(),
            };

            let record = records.entry(user_key).or_insert(Record {
                ids: Vec::new(),
                deadline: None,
            });
            for id in guest_ids {
                if !record.ids.contains(&id) {
                    record.ids.push(id);
                }
            }
        });
        Ok(())
    }

    async fn guest_expires_in(&self, token: &GuestToken) -> Result<Option<Duration>, StoreError> {
        let key = Key::Guest(token.as_str().to_owned());
        Ok(self.with_live_record(&key, |record| {
            record
                .and_then(|r| r.deadline)
                .map(|d| d.saturating_duration_since(Instant::now()))
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn guest(token: &str) -> WishlistIdentity {
        WishlistIdentity::Guest(GuestToken::new(token).unwrap())
    }

    fn ids(raw: &[i64]) -> Vec<ProductId> {
        raw.iter().copied().map(ProductId::new).collect()
    }

    #[tokio::test]
    async fn user_records_are_durable_and_ordered() {
        let store = MemoryWishlistStore::new(30 * DAY);
        let user = WishlistIdentity::User(UserId::new(1));

        assert!(store.add(&user, ProductId::new(3)).await.unwrap());
        assert!(store.add(&user, ProductId::new(1)).await.unwrap());
        assert!(!store.add(&user, ProductId::new(3)).await.unwrap());

        assert_eq!(store.product_ids(&user).await.unwrap(), ids(&[3, 1]));
    }

    #[tokio::test]
    async fn missing_record_reads_empty() {
        let store = MemoryWishlistStore::new(30 * DAY);
        assert!(store.product_ids(&guest("nobody1")).await.unwrap().is_empty());
        assert!(!store
            .contains(&guest("nobody1"), ProductId::new(1))
            .await
            .unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn guest_record_expires_after_ttl() {
        let store = MemoryWishlistStore::new(30 * DAY);
        let identity = guest("abc1234");

        store.add(&identity, ProductId::new(5)).await.unwrap();
        assert_eq!(store.product_ids(&identity).await.unwrap(), ids(&[5]));

        tokio::time::advance(31 * DAY).await;

        assert!(store.product_ids(&identity).await.unwrap().is_empty());
        assert_eq!(store.guest_expires_in(identity.guest_token().unwrap()).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn writes_slide_the_guest_ttl() {
        let store = MemoryWishlistStore::new(30 * DAY);
        let identity = guest("abc1234");

        store.add(&identity, ProductId::new(5)).await.unwrap();
        tokio::time::advance(20 * DAY).await;

        // Re-adding an existing product is a content no-op but still a write.
        assert!(!store.add(&identity, ProductId::new(5)).await.unwrap());
        tokio::time::advance(20 * DAY).await;

        // 40 days since creation, 20 since the refresh: still alive.
        assert_eq!(store.product_ids(&identity).await.unwrap(), ids(&[5]));
    }

    #[tokio::test]
    async fn merge_unions_and_destroys_guest_record() {
        let store = MemoryWishlistStore::new(30 * DAY);
        let user_id = UserId::new(9);
        let user = WishlistIdentity::User(user_id);
        let token = GuestToken::new("tok42").unwrap();
        let guest = WishlistIdentity::Guest(token.clone());

        store.add(&user, ProductId::new(1)).await.unwrap();
        store.add(&user, ProductId::new(2)).await.unwrap();
        store.add(&guest, ProductId::new(2)).await.unwrap();
        store.add(&guest, ProductId::new(3)).await.unwrap();

        store.merge_guest_into_user(user_id, &token).await.unwrap();

        assert_eq!(store.product_ids(&user).await.unwrap(), ids(&[1, 2, 3]));
        assert!(store.product_ids(&guest).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn merge_with_empty_guest_record_is_harmless() {
        let store = MemoryWishlistStore::new(30 * DAY);
        let user_id = UserId::new(9);
        let token = GuestToken::new("tok42").unwrap();

        store
            .add(&WishlistIdentity::User(user_id), ProductId::new(1))
            .await
            .unwrap();
        store.merge_guest_into_user(user_id, &token).await.unwrap();

        assert_eq!(
            store
                .product_ids(&WishlistIdentity::User(user_id))
                .await
                .unwrap(),
            ids(&[1])
        );
    }

    #[tokio::test]
    async fn clear_guest_removes_record() {
        let store = MemoryWishlistStore::new(30 * DAY);
        let token = GuestToken::new("tok42").unwrap();
        let identity = WishlistIdentity::Guest(token.clone());

        store.add(&identity, ProductId::new(8)).await.unwrap();
        store.clear_guest(&token).await.unwrap();

        assert!(store.product_ids(&identity).await.unwrap().is_empty());
    }
}
