//! Shared domain types.

mod email;
mod id;
mod identity;

pub use email::{Email, EmailError};
pub use id::{ProductId, UserId};
pub use identity::{GuestToken, GuestTokenError, WishlistIdentity};
