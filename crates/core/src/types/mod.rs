//! Core types for Ekart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod email;
pub mod id;
pub mod money;
pub mod order;
pub mod page;
pub mod sales;
pub mod status;

pub use address::{AddressError, ShippingAddress};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{CurrencyCode, Money, MoneyError};
pub use order::{DraftError, Order, OrderDraft, OrderLine, PaymentRef};
pub use page::{PageRequest, page_count};
pub use sales::{DailySales, daily_series};
pub use status::*;
