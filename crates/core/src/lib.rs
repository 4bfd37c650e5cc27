//! Ekart Core - Shared domain types.
//!
//! This crate provides the types used across all Ekart components:
//! - `api` - REST backend (orders, payments, cart)
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. This keeps the order state machine and money
//! arithmetic testable in isolation.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, money, emails, order status, shipping addresses,
//!   orders, pagination and sales aggregation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
