//! Session-related types.
//!
//! Types stored in the session for identity. Login itself is handled by the
//! auth subsystem; the engine only reads what it leaves behind.

use serde::{Deserialize, Serialize};

use stockroom_core::UserId;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address, used for order notifications.
    pub email: String,
}

/// Session keys for identity data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the anonymous cart owner key.
    pub const GUEST_CART_KEY: &str = "guest_cart_key";
}
