//! Request middleware: sessions, identity resolution, and request nonces.

pub mod identity;
pub mod nonce;
pub mod session;

pub use identity::{ResolveIdentity, clear_current_user, current_user, set_current_user};
pub use session::{SESSION_COOKIE_NAME, memory_session_layer, postgres_session_layer};
