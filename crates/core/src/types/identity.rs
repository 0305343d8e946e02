//! Cart ownership identity.
//!
//! A cart line belongs to exactly one of an authenticated user or an
//! anonymous guest. The two kinds never mix on a single line, so the owner is
//! modelled as an enum rather than a pair of optional columns.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::id::UserId;

/// Opaque key identifying an anonymous shopper's cart.
///
/// Generated once per browser session and kept in the session store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestKey(Uuid);

impl GuestKey {
    /// Generate a fresh random guest key.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for GuestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The owner of a cart: an authenticated user or an anonymous guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CartOwner {
    /// Logged-in customer.
    User(UserId),
    /// Anonymous session.
    Guest(GuestKey),
}

impl CartOwner {
    /// The user ID, if this owner is an authenticated user.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(id) => Some(*id),
            Self::Guest(_) => None,
        }
    }

    /// The guest key, if this owner is anonymous.
    #[must_use]
    pub const fn guest_key(&self) -> Option<GuestKey> {
        match self {
            Self::User(_) => None,
            Self::Guest(key) => Some(*key),
        }
    }
}

impl fmt::Display for CartOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::Guest(key) => write!(f, "guest:{key}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_kinds_are_exclusive() {
        let user = CartOwner::User(UserId::new(3));
        assert_eq!(user.user_id(), Some(UserId::new(3)));
        assert_eq!(user.guest_key(), None);

        let key = GuestKey::generate();
        let guest = CartOwner::Guest(key);
        assert_eq!(guest.user_id(), None);
        assert_eq!(guest.guest_key(), Some(key));
    }

    #[test]
    fn test_owner_display() {
        assert_eq!(CartOwner::User(UserId::new(12)).to_string(), "user:12");
        let key = GuestKey::from_uuid(Uuid::nil());
        assert_eq!(
            CartOwner::Guest(key).to_string(),
            "guest:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_generated_guest_keys_differ() {
        assert_ne!(GuestKey::generate(), GuestKey::generate());
    }
}
