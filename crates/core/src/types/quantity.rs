//! Validated per-request quantities.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest quantity a single add-to-cart or update request may carry.
pub const MAX_QUANTITY_PER_REQUEST: i32 = 99;

/// Errors produced when validating a requested quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QuantityError {
    /// The quantity was below 1.
    #[error("quantity must be at least 1")]
    TooSmall,
    /// The quantity exceeded the per-request maximum.
    #[error("quantity must be at most {MAX_QUANTITY_PER_REQUEST}")]
    TooLarge,
    /// The input was not an integer.
    #[error("quantity must be a whole number")]
    NotANumber,
}

/// A requested number of units in `1..=99`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Quantity(i32);

impl Quantity {
    /// One unit.
    pub const ONE: Self = Self(1);

    /// Validate a quantity.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError` if the value is outside `1..=99`.
    pub const fn new(value: i32) -> Result<Self, QuantityError> {
        if value < 1 {
            Err(QuantityError::TooSmall)
        } else if value > MAX_QUANTITY_PER_REQUEST {
            Err(QuantityError::TooLarge)
        } else {
            Ok(Self(value))
        }
    }

    /// Parse an optional form value, defaulting to one unit when absent or blank.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError` if the value is not an integer or out of range.
    pub fn parse_or_one(raw: Option<&str>) -> Result<Self, QuantityError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::ONE),
            Some(value) => value
                .parse::<i32>()
                .map_err(|_| QuantityError::NotANumber)
                .and_then(Self::new),
        }
    }

    /// Get the number of units.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert_eq!(Quantity::new(0), Err(QuantityError::TooSmall));
        assert_eq!(Quantity::new(-5), Err(QuantityError::TooSmall));
        assert_eq!(Quantity::new(100), Err(QuantityError::TooLarge));
        assert_eq!(Quantity::new(1).map(Quantity::get), Ok(1));
        assert_eq!(Quantity::new(99).map(Quantity::get), Ok(99));
    }

    #[test]
    fn test_parse_defaults_to_one() {
        assert_eq!(Quantity::parse_or_one(None), Ok(Quantity::ONE));
        assert_eq!(Quantity::parse_or_one(Some("  ")), Ok(Quantity::ONE));
        assert_eq!(Quantity::parse_or_one(Some("3")).map(Quantity::get), Ok(3));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(
            Quantity::parse_or_one(Some("two")),
            Err(QuantityError::NotANumber)
        );
        assert_eq!(
            Quantity::parse_or_one(Some("1.5")),
            Err(QuantityError::NotANumber)
        );
        assert_eq!(Quantity::parse_or_one(Some("150")), Err(QuantityError::TooLarge));
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<Quantity>("4").is_ok());
        assert!(serde_json::from_str::<Quantity>("0").is_err());
    }
}
