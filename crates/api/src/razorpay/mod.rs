//! Razorpay payment gateway integration.
//!
//! This module provides:
//! - [`PaymentGateway`], the seam the order service opens payment intents through
//! - [`RazorpayClient`], the HTTP implementation against the Orders API
//! - [`verify_payment_signature`] for checkout callbacks
//!
//! # Flow
//!
//! 1. The server opens a gateway order for the amount in minor units
//! 2. The client completes checkout and receives a payment id and signature
//! 3. The server recomputes the signature with the key secret and compares
//!    in constant time before marking the order paid

mod client;
mod error;
mod signature;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ekart_core::CurrencyCode;

pub use client::RazorpayClient;
pub use error::RazorpayError;
pub use signature::{payment_signature, verify_payment_signature};

/// Longest receipt string the gateway accepts.
pub const MAX_RECEIPT_LENGTH: usize = 40;

/// Parameters for opening a gateway order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateGatewayOrder {
    /// Amount in minor units (paise).
    pub amount: i64,
    pub currency: CurrencyCode,
    pub receipt: String,
}

/// A gateway order as returned by the Orders API.
///
/// Unknown fields are kept so the full gateway payload reaches the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Opens payment intents with an external gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a gateway order the client can pay against.
    async fn create_order(&self, request: &CreateGatewayOrder)
    -> Result<GatewayOrder, RazorpayError>;
}
