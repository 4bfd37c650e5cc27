//! Domain and response models for the API.
//!
//! Order records themselves live in `ekart_core`; these types cover the
//! authenticated principal, display projections of records owned by other
//! services, and the enriched order view returned to clients.

pub mod cart;
pub mod order;
pub mod product;
pub mod user;

pub use cart::{Cart, CartItem};
pub use order::{OrderLineView, OrderView};
pub use product::{ProductImage, ProductSummary};
pub use user::{CurrentUser, UserSummary};
