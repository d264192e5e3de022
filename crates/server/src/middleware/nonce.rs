//! Per-session request nonces for the AJAX surface.
//!
//! The wishlist page embeds the session's nonce; mutation requests echo it
//! back. A missing or mismatched nonce is terminal for the request; the
//! client reloads the page to obtain a fresh one.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
use tower_sessions::Session;

use crate::models::session_keys;

/// Raw entropy per nonce.
const NONCE_BYTES: usize = 24;

/// Get the session's nonce, minting one if absent.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn issue(session: &Session) -> Result<String, tower_sessions::session::Error> {
    if let Some(nonce) = session.get::<String>(session_keys::WISHLIST_NONCE).await? {
        return Ok(nonce);
    }

    let mut bytes = [0u8; NONCE_BYTES];
    rand::rng().fill(&mut bytes);
    let nonce = URL_SAFE_NO_PAD.encode(bytes);

    session
        .insert(session_keys::WISHLIST_NONCE, &nonce)
        .await?;
    Ok(nonce)
}

/// Check a supplied nonce against the session's.
///
/// Absent session nonce, absent supplied nonce, and mismatch all fail.
///
/// # Errors
///
/// Returns an error if the session cannot be read.
pub async fn verify(
    session: &Session,
    supplied: Option<&str>,
) -> Result<bool, tower_sessions::session::Error> {
    let Some(expected) = session.get::<String>(session_keys::WISHLIST_NONCE).await? else {
        return Ok(false);
    };
    Ok(supplied.is_some_and(|s| !s.is_empty() && s == expected))
}
