//! The wishlist mutation service.
//!
//! Sole owner of wishlist writes: request handlers and the login flow go
//! through this service, never the store directly. Policy switches arrive as
//! real booleans at construction.

use std::sync::Arc;

use wishlist_core::{GuestToken, ProductId, UserId, WishlistIdentity};

use crate::services::cart::CartGateway;
use crate::store::{StoreError, WishlistStore};

/// Behavior switches for the mutation service.
#[derive(Debug, Clone, Copy)]
pub struct WishlistPolicy {
    /// Adding an already-present product removes it instead.
    pub remove_on_second_click: bool,
    /// A successful cart add removes the product from the wishlist.
    pub remove_if_added_to_cart: bool,
}

/// Outcome of a membership update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateAction {
    /// The product was inserted.
    Added,
    /// The product was removed (explicitly, or by the second-click policy).
    Removed,
    /// The product was already present and the policy left it in place.
    AlreadyInWishlist,
}

/// Per-product outcome of a cart transfer.
#[derive(Debug, Clone)]
pub struct CartItemOutcome {
    pub product_id: ProductId,
    /// Whether the cart accepted the product.
    pub added: bool,
    /// Whether the product was removed from the wishlist afterwards.
    pub removed: bool,
    /// Cart page URL, when the cart service provided one.
    pub cart_url: Option<String>,
}

/// The wishlist mutation service.
#[derive(Clone)]
pub struct WishlistService {
    store: Arc<dyn WishlistStore>,
    policy: WishlistPolicy,
}

impl WishlistService {
    /// Create a new service over a store.
    #[must_use]
    pub fn new(store: Arc<dyn WishlistStore>, policy: WishlistPolicy) -> Self {
        Self { store, policy }
    }

    /// The active policy.
    #[must_use]
    pub const fn policy(&self) -> WishlistPolicy {
        self.policy
    }

    /// Insert a product. Idempotent; returns whether the record changed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if storage fails.
    pub async fn add(
        &self,
        identity: &WishlistIdentity,
        product: ProductId,
    ) -> Result<bool, StoreError> {
        self.store.add(identity, product).await
    }

    /// Remove a product. Idempotent; returns whether the record changed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if storage fails.
    pub async fn remove(
        &self,
        identity: &WishlistIdentity,
        product: ProductId,
    ) -> Result<bool, StoreError> {
        self.store.remove(identity, product).await
    }

    /// Whether the product is in the identity's record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if storage fails.
    pub async fn contains(
        &self,
        identity: &WishlistIdentity,
        product: ProductId,
    ) -> Result<bool, StoreError> {
        self.store.contains(identity, product).await
    }

    /// Number of products in the identity's record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if storage fails.
    pub async fn count(&self, identity: &WishlistIdentity) -> Result<usize, StoreError> {
        Ok(self.store.product_ids(identity).await?.len())
    }

    /// All product IDs in the identity's record, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if storage fails.
    pub async fn product_ids(
        &self,
        identity: &WishlistIdentity,
    ) -> Result<Vec<ProductId>, StoreError> {
        self.store.product_ids(identity).await
    }

    /// Apply the add-button semantics to a product.
    ///
    /// Absent products are added. Present products are removed when the
    /// second-click policy is on, and left untouched otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if storage fails.
    pub async fn toggle(
        &self,
        identity: &WishlistIdentity,
        product: ProductId,
    ) -> Result<UpdateAction, StoreError> {
        if self.store.add(identity, product).await? {
            return Ok(UpdateAction::Added);
        }
        if self.policy.remove_on_second_click {
            self.store.remove(identity, product).await?;
            return Ok(UpdateAction::Removed);
        }
        Ok(UpdateAction::AlreadyInWishlist)
    }

    /// Transfer one product to the cart, applying the removal policy.
    ///
    /// Cart rejections and cart-service failures both come back as
    /// `added: false`; the latter is logged, not propagated, so a flaky cart
    /// can't break the wishlist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if wishlist storage fails.
    pub async fn add_to_cart(
        &self,
        identity: &WishlistIdentity,
        product: ProductId,
        cart: &dyn CartGateway,
    ) -> Result<CartItemOutcome, StoreError> {
        let (added, cart_url) = match cart.add_to_cart(product).await {
            Ok(outcome) => (outcome.added, outcome.cart_url),
            Err(e) => {
                tracing::warn!(product_id = %product, "cart add failed: {e}");
                (false, None)
            }
        };

        let mut removed = false;
        if added && self.policy.remove_if_added_to_cart {
            removed = self.store.remove(identity, product).await?;
        }

        Ok(CartItemOutcome {
            product_id: product,
            added,
            removed,
            cart_url,
        })
    }

    /// Transfer every product in the record to the cart.
    ///
    /// Continues past per-item failures; the caller reflects the mixed
    /// outcome in its notice.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if wishlist storage fails.
    pub async fn add_all_to_cart(
        &self,
        identity: &WishlistIdentity,
        cart: &dyn CartGateway,
    ) -> Result<Vec<CartItemOutcome>, StoreError> {
        let mut outcomes = Vec::new();
        for product in self.store.product_ids(identity).await? {
            outcomes.push(self.add_to_cart(identity, product, cart).await?);
        }
        Ok(outcomes)
    }

    /// Merge a guest record into a user record at login.
    ///
    /// Must complete before the session starts resolving to the user, or the
    /// guest record would be orphaned.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if storage fails.
    pub async fn merge(&self, user: UserId, token: &GuestToken) -> Result<(), StoreError> {
        self.store.merge_guest_into_user(user, token).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::services::cart::{CartAddOutcome, CartError, StubCartGateway};
    use crate::store::MemoryWishlistStore;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn service(policy: WishlistPolicy) -> WishlistService {
        WishlistService::new(Arc::new(MemoryWishlistStore::new(30 * DAY)), policy)
    }

    fn default_policy() -> WishlistPolicy {
        WishlistPolicy {
            remove_on_second_click: false,
            remove_if_added_to_cart: true,
        }
    }

    fn guest(token: &str) -> WishlistIdentity {
        WishlistIdentity::Guest(GuestToken::new(token).unwrap())
    }

    fn ids(raw: &[i64]) -> Vec<ProductId> {
        raw.iter().copied().map(ProductId::new).collect()
    }

    /// Cart that rejects a fixed set of products and records calls.
    struct PickyCart {
        rejects: Vec<ProductId>,
        calls: Mutex<Vec<ProductId>>,
    }

    impl PickyCart {
        fn rejecting(rejects: &[i64]) -> Self {
            Self {
                rejects: ids(rejects),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CartGateway for PickyCart {
        async fn add_to_cart(&self, product: ProductId) -> Result<CartAddOutcome, CartError> {
            self.calls.lock().unwrap().push(product);
            Ok(CartAddOutcome {
                added: !self.rejects.contains(&product),
                cart_url: None,
            })
        }
    }

    #[tokio::test]
    async fn add_is_idempotent() {
        let service = service(default_policy());
        let identity = guest("g1");
        let p = ProductId::new(7);

        assert!(service.add(&identity, p).await.unwrap());
        assert!(!service.add(&identity, p).await.unwrap());
        assert_eq!(service.product_ids(&identity).await.unwrap(), ids(&[7]));
    }

    #[tokio::test]
    async fn remove_of_absent_member_is_a_no_op() {
        let service = service(default_policy());
        let identity = guest("g1");

        service.add(&identity, ProductId::new(1)).await.unwrap();
        assert!(!service.remove(&identity, ProductId::new(99)).await.unwrap());
        assert_eq!(service.product_ids(&identity).await.unwrap(), ids(&[1]));
    }

    #[tokio::test]
    async fn record_never_holds_duplicates() {
        let service = service(default_policy());
        let identity = guest("g1");

        for raw in [3, 1, 3, 2, 1, 3] {
            let _ = service.add(&identity, ProductId::new(raw)).await.unwrap();
        }
        service.remove(&identity, ProductId::new(1)).await.unwrap();
        let _ = service.add(&identity, ProductId::new(1)).await.unwrap();

        assert_eq!(service.product_ids(&identity).await.unwrap(), ids(&[3, 2, 1]));
    }

    #[tokio::test]
    async fn count_reflects_membership() {
        let service = service(default_policy());
        let identity = guest("g1");

        assert_eq!(service.count(&identity).await.unwrap(), 0);
        service.add(&identity, ProductId::new(1)).await.unwrap();
        service.add(&identity, ProductId::new(2)).await.unwrap();
        assert_eq!(service.count(&identity).await.unwrap(), 2);
        assert!(service.contains(&identity, ProductId::new(2)).await.unwrap());
    }

    #[tokio::test]
    async fn toggle_removes_on_second_click_when_enabled() {
        let service = service(WishlistPolicy {
            remove_on_second_click: true,
            remove_if_added_to_cart: false,
        });
        let identity = guest("g1");
        let p = ProductId::new(5);

        assert_eq!(service.toggle(&identity, p).await.unwrap(), UpdateAction::Added);
        assert_eq!(
            service.toggle(&identity, p).await.unwrap(),
            UpdateAction::Removed
        );
        assert!(service.product_ids(&identity).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn toggle_reports_already_in_wishlist_when_disabled() {
        let service = service(default_policy());
        let identity = guest("g1");
        let p = ProductId::new(5);

        assert_eq!(service.toggle(&identity, p).await.unwrap(), UpdateAction::Added);
        assert_eq!(
            service.toggle(&identity, p).await.unwrap(),
            UpdateAction::AlreadyInWishlist
        );
        assert_eq!(service.product_ids(&identity).await.unwrap(), ids(&[5]));
    }

    #[tokio::test]
    async fn cart_batch_empties_wishlist_when_all_adds_succeed() {
        let service = service(default_policy());
        let identity = guest("g1");
        service.add(&identity, ProductId::new(5)).await.unwrap();
        service.add(&identity, ProductId::new(6)).await.unwrap();

        let cart = StubCartGateway::default();
        let outcomes = service.add_all_to_cart(&identity, &cart).await.unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.added && o.removed));
        assert!(service.product_ids(&identity).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cart_batch_keeps_rejected_items() {
        let service = service(default_policy());
        let identity = guest("g1");
        service.add(&identity, ProductId::new(5)).await.unwrap();
        service.add(&identity, ProductId::new(6)).await.unwrap();

        let cart = PickyCart::rejecting(&[6]);
        let outcomes = service.add_all_to_cart(&identity, &cart).await.unwrap();

        // The rejection did not abort the batch.
        assert_eq!(cart.calls.lock().unwrap().len(), 2);
        let rejected = outcomes.iter().find(|o| o.product_id == ProductId::new(6)).unwrap();
        assert!(!rejected.added && !rejected.removed);
        assert_eq!(service.product_ids(&identity).await.unwrap(), ids(&[6]));
    }

    #[tokio::test]
    async fn cart_add_leaves_item_when_removal_policy_off() {
        let service = service(WishlistPolicy {
            remove_on_second_click: false,
            remove_if_added_to_cart: false,
        });
        let identity = guest("g1");
        service.add(&identity, ProductId::new(5)).await.unwrap();

        let cart = StubCartGateway::default();
        let outcome = service
            .add_to_cart(&identity, ProductId::new(5), &cart)
            .await
            .unwrap();

        assert!(outcome.added && !outcome.removed);
        assert_eq!(service.product_ids(&identity).await.unwrap(), ids(&[5]));
    }

    #[tokio::test]
    async fn merge_unions_and_discards_guest_record() {
        let service = service(default_policy());
        let user_id = UserId::new(3);
        let user = WishlistIdentity::User(user_id);
        let token = GuestToken::new("tok9").unwrap();
        let guest = WishlistIdentity::Guest(token.clone());

        service.add(&user, ProductId::new(1)).await.unwrap();
        service.add(&user, ProductId::new(2)).await.unwrap();
        service.add(&guest, ProductId::new(2)).await.unwrap();
        service.add(&guest, ProductId::new(3)).await.unwrap();

        service.merge(user_id, &token).await.unwrap();

        assert_eq!(service.product_ids(&user).await.unwrap(), ids(&[1, 2, 3]));
        assert!(service.product_ids(&guest).await.unwrap().is_empty());
    }
}
