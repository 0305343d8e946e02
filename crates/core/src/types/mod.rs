//! Core types for Stockroom.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod identity;
pub mod money;
pub mod quantity;
pub mod shipping;
pub mod status;

pub use id::*;
pub use identity::{CartOwner, GuestKey};
pub use money::Money;
pub use quantity::{MAX_QUANTITY_PER_REQUEST, Quantity, QuantityError};
pub use shipping::{CartTotals, ShippingPolicy};
pub use status::*;
