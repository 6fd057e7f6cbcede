//! ecomstore core - shared domain types.
//!
//! This crate provides the types used across every ecomstore component:
//! - `server` - The REST API (catalog, cart, reviews, checkout)
//! - `cli` - Command-line tools for migrations, seeding and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP clients. Database encodings are gated behind the `postgres`
//! feature so the crate stays usable without sqlx.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, emails, statuses and input validation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
