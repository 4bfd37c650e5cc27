//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Bearer token signing and verification
//! - `counter` - Fixed-window counters behind the rate limiter
//! - `orders` - Order lifecycle, payment verification, listings and sales

pub mod auth;
pub mod counter;
pub mod orders;

pub use auth::{AuthError, Claims, TokenService};
pub use counter::{CounterError, CounterStore, MemoryCounterStore, WindowCount};
pub use orders::{
    CreatedOrder, OrderError, OrderListing, OrderRequest, OrderService, PaymentOutcome,
    SalesSummary, Verification, VerifyPaymentRequest,
};
