//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `WISHLIST_DATABASE_URL` - `PostgreSQL` connection string (postgres backend)
//! - `WISHLIST_BASE_URL` - Public URL for the service
//! - `WISHLIST_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `WISHLIST_HOST` - Bind address (default: 127.0.0.1)
//! - `WISHLIST_PORT` - Listen port (default: 3000)
//! - `WISHLIST_STORAGE` - Storage backend: `postgres` or `memory` (default: postgres)
//! - `CART_SERVICE_URL` - Base URL of the storefront cart service
//! - `SENTRY_DSN` - Sentry error tracking DSN
//!
//! ## Wishlist behavior
//! - `WISHLIST_GUEST_EXPIRY_DAYS` - Guest record TTL in days (default: 30)
//! - `WISHLIST_REMOVE_ON_SECOND_CLICK` - Toggle semantics for the add button (default: false)
//! - `WISHLIST_BUTTON_ACTION` - `none`, `redirect`, or `popup` (default: popup)
//! - `WISHLIST_SHOW_ICON` - Include the icon flag in AJAX responses (default: true)
//! - `WISHLIST_REDIRECT_TO_CART` - Offer a cart redirect after add-to-cart (default: true)
//! - `WISHLIST_REMOVE_IF_ADDED_TO_CART` - Drop items once carted (default: true)
//! - `WISHLIST_*_TEXT` - Notice text overrides (see [`NoticeTexts`])
//!
//! Boolean variables accept `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off`
//! in any case. They are normalized to real booleans here; nothing downstream
//! ever compares raw strings.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Which backing store keeps wishlist records and sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Durable `PostgreSQL` storage. The default.
    Postgres,
    /// In-process storage for local development; lost on restart.
    Memory,
}

impl StorageBackend {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::InvalidEnvVar(
                "WISHLIST_STORAGE".to_owned(),
                format!("expected 'postgres' or 'memory', got '{other}'"),
            )),
        }
    }
}

/// What the client should do after an AJAX add succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    /// No follow-up.
    None,
    /// Redirect to the wishlist page.
    Redirect,
    /// Render a confirmation popup fragment.
    Popup,
}

impl ButtonAction {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "redirect" => Ok(Self::Redirect),
            "popup" => Ok(Self::Popup),
            other => Err(ConfigError::InvalidEnvVar(
                "WISHLIST_BUTTON_ACTION".to_owned(),
                format!("expected 'none', 'redirect' or 'popup', got '{other}'"),
            )),
        }
    }
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password).
    /// Absent when the memory backend is selected.
    pub database_url: Option<SecretString>,
    /// Storage backend for wishlist records and sessions
    pub storage: StorageBackend,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the service
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Base URL of the storefront cart service, if one is wired up
    pub cart_service_url: Option<String>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Wishlist behavior settings
    pub wishlist: WishlistSettings,
}

/// Wishlist behavior settings.
///
/// Loaded once at startup and injected into the components that need them;
/// there are no per-call option lookups.
#[derive(Debug, Clone)]
pub struct WishlistSettings {
    /// Days a guest record survives without a write
    pub guest_expiry_days: u32,
    /// Second click on an in-wishlist product removes it instead of no-op
    pub remove_on_second_click: bool,
    /// Client directive after a successful add
    pub button_action: ButtonAction,
    /// Include the heart-icon flag in AJAX responses
    pub show_icon: bool,
    /// Offer a cart redirect after a single add-to-cart
    pub redirect_to_cart: bool,
    /// Remove items from the wishlist once successfully carted
    pub remove_if_added_to_cart: bool,
    /// Notice texts rendered into pages and AJAX fragments
    pub texts: NoticeTexts,
}

impl WishlistSettings {
    /// Guest record TTL as a [`Duration`].
    #[must_use]
    pub fn guest_ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.guest_expiry_days) * 24 * 60 * 60)
    }
}

/// Configurable notice texts.
///
/// `{product_name}` and `{guest_session_in_days}` are substituted at render
/// time; see the `notices` module.
#[derive(Debug, Clone)]
pub struct NoticeTexts {
    pub added: String,
    pub removed: String,
    pub already_in_wishlist: String,
    pub added_to_cart: String,
    pub view_wishlist: String,
    pub view_cart: String,
    pub empty: String,
    pub guest_notice: String,
    pub add_to_cart_label: String,
    pub add_all_to_cart_label: String,
    pub in_stock: String,
    pub out_of_stock: String,
    pub undo: String,
}

impl Default for NoticeTexts {
    fn default() -> Self {
        Self {
            added: "{product_name} Added to Wishlist".to_owned(),
            removed: "{product_name} Removed from Wishlist".to_owned(),
            already_in_wishlist: "{product_name} Already in Wishlist".to_owned(),
            added_to_cart: "{product_name} added to cart".to_owned(),
            view_wishlist: "View Wishlist".to_owned(),
            view_cart: "View Cart".to_owned(),
            empty: "No items in your wishlist".to_owned(),
            guest_notice: "please log in to save items to your wishlist. \
                           This wishlist will be deleted after {guest_session_in_days}."
                .to_owned(),
            add_to_cart_label: "Add to Cart".to_owned(),
            add_all_to_cart_label: "Add All to Cart".to_owned(),
            in_stock: "In Stock".to_owned(),
            out_of_stock: "Out of Stock".to_owned(),
            undo: "Undo?".to_owned(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let storage = StorageBackend::parse(&get_env_or_default("WISHLIST_STORAGE", "postgres"))?;
        let database_url = match storage {
            StorageBackend::Postgres => Some(SecretString::from(get_required_env(
                "WISHLIST_DATABASE_URL",
            )?)),
            StorageBackend::Memory => None,
        };

        let host = get_env_or_default("WISHLIST_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("WISHLIST_HOST".to_owned(), e.to_string()))?;
        let port = get_env_or_default("WISHLIST_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("WISHLIST_PORT".to_owned(), e.to_string()))?;

        let base_url = get_required_env("WISHLIST_BASE_URL")?;
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("WISHLIST_BASE_URL".to_owned(), e.to_string())
        })?;

        let session_secret = get_validated_secret("WISHLIST_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "WISHLIST_SESSION_SECRET")?;

        let cart_service_url = get_optional_env("CART_SERVICE_URL");
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let wishlist = WishlistSettings::from_env()?;

        Ok(Self {
            database_url,
            storage,
            host,
            port,
            base_url,
            session_secret,
            cart_service_url,
            sentry_dsn,
            wishlist,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// The wishlist page URL, used for redirect directives and notices.
    #[must_use]
    pub fn wishlist_url(&self) -> String {
        format!("{}/wishlist", self.base_url.trim_end_matches('/'))
    }
}

impl WishlistSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let guest_expiry_days = get_env_or_default("WISHLIST_GUEST_EXPIRY_DAYS", "30")
            .parse::<u32>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("WISHLIST_GUEST_EXPIRY_DAYS".to_owned(), e.to_string())
            })?;

        Ok(Self {
            guest_expiry_days,
            remove_on_second_click: get_bool_env("WISHLIST_REMOVE_ON_SECOND_CLICK", false)?,
            button_action: ButtonAction::parse(&get_env_or_default(
                "WISHLIST_BUTTON_ACTION",
                "popup",
            ))?,
            show_icon: get_bool_env("WISHLIST_SHOW_ICON", true)?,
            redirect_to_cart: get_bool_env("WISHLIST_REDIRECT_TO_CART", true)?,
            remove_if_added_to_cart: get_bool_env("WISHLIST_REMOVE_IF_ADDED_TO_CART", true)?,
            texts: NoticeTexts::from_env(),
        })
    }
}

impl NoticeTexts {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            added: get_env_or_default("WISHLIST_ADDED_TEXT", &defaults.added),
            removed: get_env_or_default("WISHLIST_REMOVED_TEXT", &defaults.removed),
            already_in_wishlist: get_env_or_default(
                "WISHLIST_ALREADY_TEXT",
                &defaults.already_in_wishlist,
            ),
            added_to_cart: get_env_or_default(
                "WISHLIST_ADDED_TO_CART_TEXT",
                &defaults.added_to_cart,
            ),
            view_wishlist: get_env_or_default(
                "WISHLIST_VIEW_WISHLIST_TEXT",
                &defaults.view_wishlist,
            ),
            view_cart: get_env_or_default("WISHLIST_VIEW_CART_TEXT", &defaults.view_cart),
            empty: get_env_or_default("WISHLIST_EMPTY_TEXT", &defaults.empty),
            guest_notice: get_env_or_default("WISHLIST_GUEST_NOTICE_TEXT", &defaults.guest_notice),
            add_to_cart_label: get_env_or_default(
                "WISHLIST_ADD_TO_CART_LABEL",
                &defaults.add_to_cart_label,
            ),
            add_all_to_cart_label: get_env_or_default(
                "WISHLIST_ADD_ALL_TO_CART_LABEL",
                &defaults.add_all_to_cart_label,
            ),
            in_stock: get_env_or_default("WISHLIST_IN_STOCK_TEXT", &defaults.in_stock),
            out_of_stock: get_env_or_default("WISHLIST_OUT_OF_STOCK_TEXT", &defaults.out_of_stock),
            undo: get_env_or_default("WISHLIST_UNDO_TEXT", &defaults.undo),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_owned()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Get a boolean environment variable with a default value.
fn get_bool_env(key: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => parse_bool(&raw)
            .ok_or_else(|| ConfigError::InvalidEnvVar(key.to_owned(), format!("'{raw}' is not a boolean"))),
        Err(_) => Ok(default),
    }
}

/// Normalize the boolean spellings accepted in configuration.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_owned(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_owned(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_owned(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
