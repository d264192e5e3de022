//! Cart collaborator gateway.
//!
//! The cart itself belongs to the storefront; this service only asks it to
//! add products and reflects the outcome. A rejected add (out of stock,
//! unknown product) is a normal outcome, not an error. Errors are reserved
//! for the cart service being unreachable or misbehaving.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use wishlist_core::ProductId;

/// Errors that can occur when talking to the cart service.
#[derive(Debug, Error)]
pub enum CartError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Cart service returned an error response.
    #[error("cart service error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// Result of asking the cart to add one product.
#[derive(Debug, Clone, Deserialize)]
pub struct CartAddOutcome {
    /// Whether the product landed in the cart.
    pub added: bool,
    /// Cart page URL, when the cart service provides one.
    #[serde(default)]
    pub cart_url: Option<String>,
}

/// A collaborator that can receive products from the wishlist.
#[async_trait]
pub trait CartGateway: Send + Sync {
    /// Ask the cart to add one unit of the product.
    async fn add_to_cart(&self, product: ProductId) -> Result<CartAddOutcome, CartError>;
}

#[derive(Debug, Serialize)]
struct AddToCartRequest {
    product_id: ProductId,
    quantity: u32,
}

/// HTTP client for the storefront cart service.
#[derive(Clone)]
pub struct HttpCartGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCartGateway {
    /// Create a new gateway against the given cart service base URL.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl CartGateway for HttpCartGateway {
    async fn add_to_cart(&self, product: ProductId) -> Result<CartAddOutcome, CartError> {
        let url = format!("{}/cart/add", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&AddToCartRequest {
                product_id: product,
                quantity: 1,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CartError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

/// Cart gateway for the memory backend: accepts everything.
///
/// Lets the full wishlist flow run locally without a storefront.
#[derive(Debug, Clone, Default)]
pub struct StubCartGateway {
    cart_url: Option<String>,
}

impl StubCartGateway {
    /// Create a stub that reports the given cart URL on success.
    #[must_use]
    pub fn new(cart_url: Option<String>) -> Self {
        Self { cart_url }
    }
}

#[async_trait]
impl CartGateway for StubCartGateway {
    async fn add_to_cart(&self, _product: ProductId) -> Result<CartAddOutcome, CartError> {
        Ok(CartAddOutcome {
            added: true,
            cart_url: self.cart_url.clone(),
        })
    }
}
