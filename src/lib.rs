//! Storefront service
//!
//! Self-hosted storefront backend: product catalog, per-user and guest
//! shopping carts, order checkout with transactional inventory decrements,
//! cancellation and per-item refunds with inventory restoration, discounts,
//! reviews, and wishlists.
//!
//! ## Layout
//! - [`domain`] — aggregates, value objects, and domain events
//! - [`store`] — persistence behind the [`store::Store`] trait (in-memory
//!   and Postgres backends)
//! - [`services`] — workflow orchestration plus best-effort collaborators
//!   (mail, invoices, event publishing)
//! - [`http`] — REST adapters
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod services;
pub mod store;

pub use error::{Error, Result};
