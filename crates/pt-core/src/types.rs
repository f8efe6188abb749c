//! Core type definitions with validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for caller-supplied input.
///
/// These are raised by boundary layers while parsing identifiers and dates;
/// nothing past the boundary produces them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The identifier was not a non-negative integer.
    #[error("invalid {field}: {value:?}")]
    InvalidId { field: &'static str, value: String },

    /// The calendar date could not be parsed.
    #[error("invalid date {value:?}, use YYYY-MM-DD")]
    InvalidDate { value: String },
}

/// Generates a validated snowflake ID newtype with common trait implementations.
macro_rules! define_snowflake_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "i64", into = "i64")]
        pub struct $name(i64);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: i64) -> Result<Self, ValidationError> {
                if id < 0 {
                    return Err(ValidationError::InvalidId {
                        field: $field_name,
                        value: id.to_string(),
                    });
                }
                Ok(Self(id))
            }

            /// Returns the raw integer value.
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let invalid = || ValidationError::InvalidId {
                    field: $field_name,
                    value: s.to_string(),
                };
                let id: i64 = s.trim().parse().map_err(|_| invalid())?;
                Self::new(id).map_err(|_| invalid())
            }
        }

        impl TryFrom<i64> for $name {
            type Error = ValidationError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_snowflake_id!(
    /// A validated user identifier.
    ///
    /// User IDs are platform snowflakes: non-negative 64-bit integers.
    UserId, "user ID"
);

define_snowflake_id!(
    /// A validated guild identifier.
    GuildId, "guild ID"
);
