//! Collaborator gateways and the wishlist mutation service.
//!
//! The wishlist service owns every write to wishlist storage. The cart,
//! catalog, and user stores are collaborators behind trait seams so the
//! postgres and in-memory deployments (and tests) can swap implementations.

pub mod cart;
pub mod catalog;
pub mod users;
pub mod wishlist;
