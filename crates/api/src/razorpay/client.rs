//! HTTP client for the Razorpay Orders API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, error, instrument};

use super::error::RazorpayError;
use super::{CreateGatewayOrder, GatewayOrder, PaymentGateway};
use crate::config::RazorpayConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Razorpay API client authenticated with a key id and secret.
#[derive(Clone)]
pub struct RazorpayClient {
    client: Client,
    orders_url: String,
    key_id: String,
    key_secret: SecretString,
}

/// Error envelope returned by the Razorpay API.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl RazorpayClient {
    /// Create a new Razorpay API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &RazorpayConfig) -> Result<Self, RazorpayError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            orders_url: format!("{}/orders", config.api_base.as_str().trim_end_matches('/')),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    #[instrument(skip(self), fields(amount = request.amount, currency = %request.currency))]
    async fn create_order(
        &self,
        request: &CreateGatewayOrder,
    ) -> Result<GatewayOrder, RazorpayError> {
        let response = self
            .client
            .post(&self.orders_url)
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&body).map_or(body, |e| {
                format!(
                    "{}: {}",
                    e.error.code.unwrap_or_default(),
                    e.error.description.unwrap_or_default()
                )
            });
            error!(status = status.as_u16(), %message, "Razorpay order creation failed");
            return Err(RazorpayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let order: GatewayOrder = response
            .json()
            .await
            .map_err(|e| RazorpayError::Parse(e.to_string()))?;

        debug!(gateway_order_id = %order.id, "Razorpay order created");
        Ok(order)
    }
}
