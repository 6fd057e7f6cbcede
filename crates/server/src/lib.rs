//! ecomstore server library.
//!
//! The REST API as a library so the binary, the CLI and the tests share
//! one router, one set of services and one database layer.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod paypal;
pub mod routes;
pub mod services;
pub mod state;
