//! Cart route handlers.
//!
//! Cart mutations belong to the cart service; this API only exposes the
//! caller's cart so clients can confirm it was cleared after payment.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Cart;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub success: bool,
    pub cart: Cart,
}

/// Show the caller's cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartResponse>> {
    let cart = state.carts().get(user.id).await?;
    Ok(Json(CartResponse {
        success: true,
        cart,
    }))
}
