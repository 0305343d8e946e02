//! Business error type shared by the reservation and order services.

use thiserror::Error;

use stockroom_core::{CartLineId, OrderId, ProductId, QuantityError, TransitionError};

use crate::db::RepositoryError;

/// Errors that can occur while reserving stock or moving orders.
///
/// Every variant except `Storage` is detected before commit and leaves the
/// store untouched.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// Request input failed validation.
    #[error("{0}")]
    Validation(String),

    /// Product does not exist or is not for sale.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// Cart line does not exist, is removed, or belongs to someone else.
    #[error("cart item {0} not found")]
    CartLineNotFound(CartLineId),

    /// Order does not exist or belongs to someone else.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// Not enough units left to satisfy the request.
    #[error("only {available} left in stock")]
    OutOfStock {
        product_id: ProductId,
        requested: i32,
        available: i32,
    },

    /// Order status move not in the transition table.
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    /// Checkout attempted with nothing purchasable in the cart.
    #[error("your cart is empty")]
    EmptyCart,

    /// Storage failed; the transaction was rolled back.
    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

impl From<QuantityError> for CommerceError {
    fn from(err: QuantityError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl CommerceError {
    /// Whether the failure was caused by the request rather than the server.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use stockroom_core::OrderStatus;

    use super::*;

    #[test]
    fn test_out_of_stock_message_names_available_units() {
        let err = CommerceError::OutOfStock {
            product_id: ProductId::new(1),
            requested: 2,
            available: 1,
        };
        assert_eq!(err.to_string(), "only 1 left in stock");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_transition_error_passes_through() {
        let err = CommerceError::from(TransitionError {
            from: OrderStatus::Shipped,
            to: OrderStatus::Cancelled,
        });
        assert_eq!(err.to_string(), "cannot move order from shipped to cancelled");
    }

    #[test]
    fn test_storage_is_server_error() {
        assert!(!CommerceError::Storage(RepositoryError::NotFound).is_client_error());
    }

    #[test]
    fn test_quantity_error_becomes_validation() {
        assert!(matches!(
            CommerceError::from(QuantityError::TooLarge),
            CommerceError::Validation(msg) if msg == "quantity must be at most 99"
        ));
    }
}
