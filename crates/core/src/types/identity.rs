//! The wishlist identity model.
//!
//! Every request acts on behalf of exactly one identity: an authenticated
//! user or an anonymous guest holding a server-minted token. The identity is
//! resolved once per request and used consistently for its duration.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Errors that can occur when constructing a [`GuestToken`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GuestTokenError {
    /// The token string is empty.
    #[error("guest token cannot be empty")]
    Empty,
    /// The token string is too long.
    #[error("guest token must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The token contains a character outside `[A-Za-z0-9]`.
    #[error("guest token must be alphanumeric")]
    NotAlphanumeric,
}

/// A stable anonymous session key.
///
/// Guest tokens are random alphanumeric strings minted by the server on first
/// contact and persisted in the visitor's session. They key the guest's
/// wishlist record until the visitor logs in (at which point the record is
/// merged into the user's) or the record expires.
///
/// The type validates shape only; minting is the identity resolver's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestToken(String);

impl GuestToken {
    /// Maximum accepted token length.
    pub const MAX_LENGTH: usize = 64;

    /// Validate and wrap a token string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is empty, longer than
    /// [`Self::MAX_LENGTH`], or contains non-alphanumeric characters.
    pub fn new(token: impl Into<String>) -> Result<Self, GuestTokenError> {
        let token = token.into();
        if token.is_empty() {
            return Err(GuestTokenError::Empty);
        }
        if token.len() > Self::MAX_LENGTH {
            return Err(GuestTokenError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !token.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(GuestTokenError::NotAlphanumeric);
        }
        Ok(Self(token))
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the token and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for GuestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for GuestToken {
    type Err = GuestTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// The identity a wishlist request acts on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WishlistIdentity {
    /// An authenticated user. Wishlist storage is durable.
    User(UserId),
    /// An anonymous guest. Wishlist storage is time-limited.
    Guest(GuestToken),
}

impl WishlistIdentity {
    /// Whether this identity is an anonymous guest.
    #[must_use]
    pub const fn is_guest(&self) -> bool {
        matches!(self, Self::Guest(_))
    }

    /// The user ID, if authenticated.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(id) => Some(*id),
            Self::Guest(_) => None,
        }
    }

    /// The guest token, if anonymous.
    #[must_use]
    pub const fn guest_token(&self) -> Option<&GuestToken> {
        match self {
            Self::User(_) => None,
            Self::Guest(token) => Some(token),
        }
    }
}

impl fmt::Display for WishlistIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::Guest(token) => write!(f, "guest:{token}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn token_accepts_alphanumeric() {
        assert!(GuestToken::new("a1B2c3D").is_ok());
        assert!(GuestToken::new("Z").is_ok());
    }

    #[test]
    fn token_rejects_empty() {
        assert_eq!(GuestToken::new(""), Err(GuestTokenError::Empty));
    }

    #[test]
    fn token_rejects_symbols_and_whitespace() {
        assert_eq!(
            GuestToken::new("abc def"),
            Err(GuestTokenError::NotAlphanumeric)
        );
        assert_eq!(
            GuestToken::new("abc-def"),
            Err(GuestTokenError::NotAlphanumeric)
        );
    }

    #[test]
    fn token_rejects_overlong() {
        let long = "a".repeat(GuestToken::MAX_LENGTH + 1);
        assert!(matches!(
            GuestToken::new(long),
            Err(GuestTokenError::TooLong { .. })
        ));
    }

    #[test]
    fn identity_accessors() {
        let user = WishlistIdentity::User(UserId::new(5));
        assert!(!user.is_guest());
        assert_eq!(user.user_id(), Some(UserId::new(5)));
        assert!(user.guest_token().is_none());

        let token = GuestToken::new("tok123").unwrap();
        let guest = WishlistIdentity::Guest(token.clone());
        assert!(guest.is_guest());
        assert_eq!(guest.guest_token(), Some(&token));
        assert!(guest.user_id().is_none());
    }

    #[test]
    fn token_serde_is_transparent() {
        let token = GuestToken::new("abc123").unwrap();
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, "\"abc123\"");
        let back: GuestToken = serde_json::from_str(&json).unwrap();
        assert_eq!(back, token);
    }
}
