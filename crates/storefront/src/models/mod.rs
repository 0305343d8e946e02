//! Domain models for the storefront engine.
//!
//! These are validated domain objects, separate from database row types
//! where the two differ (cart lines store their owner as two nullable
//! columns but expose a [`CartOwner`](stockroom_core::CartOwner)).

pub mod cart;
pub mod order;
pub mod product;
pub mod session;
pub mod tracking;

pub use cart::{CartItem, CartLine, CartStats, CartSummary};
pub use order::{NewOrder, NewOrderItem, Order, OrderDetail, OrderItem};
pub use product::{NewProduct, Product};
pub use session::{CurrentUser, keys as session_keys};
pub use tracking::TrackingEvent;
