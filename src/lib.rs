//! Storefront Orders
//!
//! Cart, checkout and order back-office service for an e-commerce
//! storefront.
//!
//! ## Features
//! - Owner-scoped carts with merge-on-add semantics and an idempotent,
//!   all-or-nothing login sync
//! - A linear checkout step machine with per-step validation
//! - Stock-aware order creation: one transaction that reserves inventory,
//!   snapshots prices and clears the cart together
//! - Guarded order-status lifecycle with append-only history
//! - Notification outbox (WhatsApp deep links) with dispatch tracking

pub mod checkout;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod service;

pub use error::{AppError, Result};
