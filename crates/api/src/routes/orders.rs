//! Order route handlers.
//!
//! Every response uses the `{ "success": bool, "message"?: ..., ... }`
//! envelope. Mutations echo the order with bare ids; listings join in owner
//! and product display fields.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tracing::instrument;

use ekart_core::{PageRequest, UserId};

use crate::db::OrderFilter;
use crate::error::Result;
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::OrderView;
use crate::razorpay::GatewayOrder;
use crate::routes::{AppJson, AppPath, AppQuery};
use crate::services::orders::{OrderListing, OrderRequest, SalesSummary, VerifyPaymentRequest};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub success: bool,
    pub message: &'static str,
    pub razorpay_order: GatewayOrder,
    pub order: OrderView,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub success: bool,
    pub message: &'static str,
    pub order: OrderView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListResponse {
    pub success: bool,
    pub count: usize,
    pub total_orders: u64,
    pub total_pages: u64,
    pub page: u32,
    pub orders: Vec<OrderView>,
}

impl From<OrderListing> for OrderListResponse {
    fn from(listing: OrderListing) -> Self {
        Self {
            success: true,
            count: listing.orders.len(),
            total_orders: listing.total,
            total_pages: listing.total_pages,
            page: listing.page,
            orders: listing.orders,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SalesResponse {
    pub success: bool,
    #[serde(flatten)]
    pub summary: SalesSummary,
}

/// Open a gateway order and record it as `Pending`.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(request): AppJson<OrderRequest>,
) -> Result<(StatusCode, Json<CreateOrderResponse>)> {
    let created = state.order_service().create_order(&user, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            success: true,
            message: "Order created successfully",
            razorpay_order: created.gateway_order,
            order: OrderView::unpopulated(created.order),
        }),
    ))
}

/// Place an order without the gateway; it is `Paid` immediately.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn place_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(request): AppJson<OrderRequest>,
) -> Result<Json<OrderResponse>> {
    let order = state
        .order_service()
        .place_order_direct(&user, request)
        .await?;

    Ok(Json(OrderResponse {
        success: true,
        message: "Order placed successfully",
        order: OrderView::unpopulated(order),
    }))
}

/// Verify the checkout callback and settle the order.
///
/// A bad signature still answers 200 with `success: false`; the order is
/// marked `Failed` if it was pending.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn verify_payment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(request): AppJson<VerifyPaymentRequest>,
) -> Result<Json<OrderResponse>> {
    let verification = state.order_service().verify_payment(&user, request).await?;

    Ok(Json(OrderResponse {
        success: verification.outcome.is_success(),
        message: verification.outcome.message(),
        order: OrderView::unpopulated(verification.order),
    }))
}

/// The caller's own orders.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn my_orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppQuery(page): AppQuery<PageRequest>,
) -> Result<Json<OrderListResponse>> {
    let listing = state
        .order_service()
        .list_orders(OrderFilter::User(user.id), page)
        .await?;
    Ok(Json(listing.into()))
}

/// Every order (admin).
#[instrument(skip_all, fields(user_id = %admin.id))]
pub async fn all_orders(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    AppQuery(page): AppQuery<PageRequest>,
) -> Result<Json<OrderListResponse>> {
    let listing = state
        .order_service()
        .list_orders(OrderFilter::All, page)
        .await?;
    Ok(Json(listing.into()))
}

/// One user's orders (admin).
#[instrument(skip_all, fields(user_id = %admin.id, target_user = %target))]
pub async fn user_orders(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    AppPath(target): AppPath<UserId>,
    AppQuery(page): AppQuery<PageRequest>,
) -> Result<Json<OrderListResponse>> {
    let listing = state
        .order_service()
        .list_orders(OrderFilter::User(target), page)
        .await?;
    Ok(Json(listing.into()))
}

/// Store-wide totals and the daily sales series (admin).
#[instrument(skip_all, fields(user_id = %admin.id))]
pub async fn sales(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<SalesResponse>> {
    let summary = state.order_service().sales_summary().await?;
    Ok(Json(SalesResponse {
        success: true,
        summary,
    }))
}
