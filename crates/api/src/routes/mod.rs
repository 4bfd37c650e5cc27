//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Readiness (database reachable)
//!
//! # Orders (bearer auth; mutations are rate limited per client address)
//! POST /api/orders/create-order         - Open gateway order + Pending order (201)
//! POST /api/orders/place-order          - Direct placement, immediately Paid
//! POST /api/orders/verify-payment       - Verify checkout signature, settle order
//! GET  /api/orders/myorder              - Caller's orders, paginated
//!
//! # Orders (admin)
//! GET  /api/orders/all                  - All orders, paginated
//! GET  /api/orders/user-order/{userId}  - One user's orders, paginated
//! GET  /api/orders/sales                - Paid totals and daily series
//!
//! # Cart (bearer auth)
//! GET  /api/cart                        - Caller's cart
//! ```

pub mod cart;
pub mod health;
pub mod orders;

use axum::{
    Router,
    extract::{FromRequest, FromRequestParts, Path, Query},
    middleware::from_fn_with_state,
    routing::{get, post},
};

use crate::error::AppError;
use crate::middleware::rate_limit;
use crate::state::AppState;

/// JSON body extractor whose rejection renders the API error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query string extractor whose rejection renders the API error envelope.
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// Path extractor whose rejection renders the API error envelope.
#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

/// Create the order routes router.
pub fn order_routes(state: &AppState) -> Router<AppState> {
    let mutations = Router::new()
        .route("/create-order", post(orders::create_order))
        .route("/place-order", post(orders::place_order))
        .route("/verify-payment", post(orders::verify_payment))
        .route_layer(from_fn_with_state(state.order_limiter().clone(), rate_limit));

    Router::new()
        .merge(mutations)
        .route("/myorder", get(orders::my_orders))
        .route("/all", get(orders::all_orders))
        .route("/user-order/{user_id}", get(orders::user_orders))
        .route("/sales", get(orders::sales))
}

/// Create all `/api` routes.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/orders", order_routes(state))
        .route("/cart", get(cart::show))
}
