//! Typed identifiers for the fulfillment domain.
//!
//! Every foreign reference in the domain is a newtype over an opaque string.
//! This keeps function signatures honest (an order id cannot be passed where
//! a seller id is expected) and gives serialization a stable shape.
//!
//! # Validation
//!
//! - `FromStr::from_str()`: validates input (rejects empty strings)
//! - `From::from()` and `new()`: no validation (for application-controlled data)
//!
//! Use `FromStr` when parsing external input; use `new()` or `From` when the
//! value is already trusted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Error type for identifier parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid identifier: {0}")]
pub struct ParseIdError(String);

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident, $empty_msg:literal) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from trusted input (no validation).
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Convert the identifier into its inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.is_empty() {
                    return Err(ParseIdError($empty_msg.to_string()));
                }
                Ok(Self(s.to_string()))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Unique identifier for an order.
    ///
    /// Immutable for the lifetime of the order; also the aggregate key under
    /// which the order and all of its return requests are persisted.
    OrderId,
    "Order ID cannot be empty"
);

string_id!(
    /// Unique identifier for a return request.
    ReturnId,
    "Return ID cannot be empty"
);

string_id!(
    /// Identifier of the buyer who placed an order.
    BuyerId,
    "Buyer ID cannot be empty"
);

string_id!(
    /// Identifier of the seller fulfilling an order.
    SellerId,
    "Seller ID cannot be empty"
);

string_id!(
    /// Identifier of the catalog listing an order was placed against.
    ListingId,
    "Listing ID cannot be empty"
);

impl OrderId {
    /// Generate a fresh random order id.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("order-{}", Uuid::new_v4()))
    }
}

impl ReturnId {
    /// Generate a fresh random return id.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("return-{}", Uuid::new_v4()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_creates_id() {
        let id = OrderId::new("order-123");
        assert_eq!(id.as_str(), "order-123");
    }

    #[test]
    #[allow(clippy::expect_used)] // Panics: test will fail if parse fails
    fn parse_from_str() {
        let id: ReturnId = "return-42".parse().expect("parse should succeed");
        assert_eq!(id, ReturnId::new("return-42"));
    }

    #[test]
    fn parse_empty_string_fails() {
        assert!("".parse::<OrderId>().is_err());
        assert!("".parse::<SellerId>().is_err());
    }

    #[test]
    fn display_roundtrip() {
        let id = BuyerId::new("buyer-7");
        assert_eq!(format!("{id}"), "buyer-7");
        assert_eq!(id.into_inner(), "buyer-7");
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(OrderId::generate(), OrderId::generate());
        assert_ne!(ReturnId::generate(), ReturnId::generate());
    }

    #[test]
    fn generated_ids_carry_entity_prefix() {
        assert!(OrderId::generate().as_str().starts_with("order-"));
        assert!(ReturnId::generate().as_str().starts_with("return-"));
    }
}
