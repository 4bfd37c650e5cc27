//! Razorpay-related errors.

use thiserror::Error;

/// Errors that can occur when interacting with Razorpay.
#[derive(Debug, Error)]
pub enum RazorpayError {
    /// HTTP request failed.
    #[error("Razorpay request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Razorpay returned an error response.
    #[error("Razorpay API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Razorpay response error: {0}")]
    Parse(String),

    /// The key secret cannot key an HMAC.
    #[error("Razorpay key secret is unusable: {0}")]
    InvalidKey(String),
}
