//! Session-related types.
//!
//! Types stored in the session for identity and request-token state.

use serde::{Deserialize, Serialize};

use wishlist_core::{Email, UserId};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
}

/// Session keys for wishlist and authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the server-minted guest wishlist token.
    pub const GUEST_TOKEN: &str = "wishlist_guest_token";

    /// Key for the per-session AJAX request nonce.
    pub const WISHLIST_NONCE: &str = "wishlist_nonce";

    /// Key for a one-shot flash notice set by the non-JS add fallback.
    pub const FLASH_NOTICE: &str = "wishlist_flash";
}
