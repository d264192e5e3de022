//! Identity resolution.
//!
//! Every wishlist request acts on behalf of exactly one identity. The
//! extractor resolves it once per request: the session's logged-in user if
//! present, otherwise the session's guest token. Tokens are minted
//! server-side on first contact, so a request never arrives without a
//! resolvable identity.
//!
//! This module is the only place guest tokens are minted.

use axum::{extract::FromRequestParts, http::request::Parts};
use rand::{Rng, distr::Alphanumeric};
use tower_sessions::Session;

use wishlist_core::{GuestToken, WishlistIdentity};

use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};

/// Length of server-minted guest tokens.
const GUEST_TOKEN_LEN: usize = 16;

/// Extractor that resolves the request's wishlist identity.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(
///     ResolveIdentity(identity): ResolveIdentity,
/// ) -> impl IntoResponse {
///     format!("acting for {identity}")
/// }
/// ```
pub struct ResolveIdentity(pub WishlistIdentity);

impl<S> FromRequestParts<S> for ResolveIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Session is inserted into extensions by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_owned()))?;

        if let Some(user) = current_user(&session).await {
            return Ok(Self(WishlistIdentity::User(user.id)));
        }

        // A stored token that fails validation is treated as absent and
        // replaced rather than rejected.
        let stored = session
            .get::<String>(session_keys::GUEST_TOKEN)
            .await?
            .and_then(|raw| GuestToken::new(raw).ok());

        let token = match stored {
            Some(token) => token,
            None => {
                let token = mint_guest_token();
                session
                    .insert(session_keys::GUEST_TOKEN, token.as_str())
                    .await?;
                tracing::debug!(token = %token, "minted guest wishlist token");
                token
            }
        };

        Ok(Self(WishlistIdentity::Guest(token)))
    }
}

/// Mint a fresh random guest token.
fn mint_guest_token() -> GuestToken {
    let raw: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GUEST_TOKEN_LEN)
        .map(char::from)
        .collect();
    // Alphanumeric output always satisfies the token shape.
    GuestToken::new(raw).unwrap_or_else(|_| unreachable!("minted token is alphanumeric"))
}

/// The logged-in user, if any.
pub async fn current_user(session: &Session) -> Option<CurrentUser> {
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// Store the logged-in user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Clear the logged-in user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_tokens_are_valid_and_distinct() {
        let a = mint_guest_token();
        let b = mint_guest_token();
        assert_eq!(a.as_str().len(), GUEST_TOKEN_LEN);
        assert_ne!(a, b);
    }
}
