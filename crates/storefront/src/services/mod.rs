//! Business logic services for the storefront engine.
//!
//! # Services
//!
//! - `reservation` - Cart lines and the stock they hold
//! - `orders` - Checkout, fulfilment transitions, cancellation
//! - `notification` - Customer notifications sent after commit
//!
//! Services own no connection state; each call opens one transaction on the
//! shared [`InventoryStore`](crate::db::InventoryStore) and commits or drops it.

mod error;
pub mod notification;
pub mod orders;
pub mod reservation;

pub use error::CommerceError;
pub use notification::{
    CancellationNotice, EmailNotifier, LogNotifier, NotificationError, OrderNotifier,
};
pub use orders::OrderService;
pub use reservation::{AddItemOutcome, ReservationService, ReservedProduct};
