//! User lookup and password verification for the login flow.
//!
//! Login matters to the wishlist because it is the merge trigger: the moment
//! a guest authenticates, their transient record must fold into the durable
//! one. The user store itself is minimal: email lookup plus an argon2
//! password hash.

use std::collections::HashMap;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use wishlist_core::{Email, UserId};

/// Errors that can occur during user lookups.
#[derive(Debug, Error)]
pub enum UserStoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors that can occur hashing or verifying passwords.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// The stored hash could not be parsed or the hasher failed.
    #[error("password hashing error: {0}")]
    Hash(String),
}

/// A user row as the login flow sees it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: UserId,
    pub email: Email,
    pub password_hash: String,
}

/// Read-only user lookup for authentication.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by email address.
    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>, UserStoreError>;
}

/// `PostgreSQL`-backed user store.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>, UserStoreError> {
        let user = sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, password_hash FROM users WHERE email = $1",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}

/// In-memory user store for the memory backend and tests.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: HashMap<String, UserRecord>,
}

impl MemoryUserStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user, hashing the given password.
    ///
    /// # Errors
    ///
    /// Returns [`PasswordError`] if hashing fails.
    pub fn with_user(
        mut self,
        id: UserId,
        email: Email,
        password: &str,
    ) -> Result<Self, PasswordError> {
        let password_hash = hash_password(password)?;
        self.users.insert(
            email.as_str().to_owned(),
            UserRecord {
                id,
                email,
                password_hash,
            },
        );
        Ok(self)
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>, UserStoreError> {
        Ok(self.users.get(email.as_str()).cloned())
    }
}

/// Hash a password with argon2 and a fresh salt.
///
/// # Errors
///
/// Returns [`PasswordError`] if the hasher fails.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Verify a password against a stored argon2 hash.
///
/// A mismatch is `Ok(false)`; only an unparseable hash is an error.
///
/// # Errors
///
/// Returns [`PasswordError`] if the stored hash is malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::Hash(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::Hash(e.to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hash = hash_password("hunter2hunter2").unwrap();
        assert!(verify_password("hunter2hunter2", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn verify_rejects_malformed_hash() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }

    #[tokio::test]
    async fn memory_store_finds_seeded_user() {
        let email = Email::parse("shopper@example.com").unwrap();
        let store = MemoryUserStore::new()
            .with_user(UserId::new(1), email.clone(), "swordfish123")
            .unwrap();

        let found = store.find_by_email(&email).await.unwrap().unwrap();
        assert_eq!(found.id, UserId::new(1));
        assert!(verify_password("swordfish123", &found.password_hash).unwrap());

        let missing = Email::parse("nobody@example.com").unwrap();
        assert!(store.find_by_email(&missing).await.unwrap().is_none());
    }
}
