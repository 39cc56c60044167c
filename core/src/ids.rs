//! Strongly typed identifiers for catalog entities.
//!
//! Storage assigns every identifier (`BIGSERIAL` in Postgres), so the wrappers
//! are thin: they exist to keep a `RecipeId` from being passed where a
//! `UserId` is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when an identifier cannot be parsed from text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {kind} id: {input}")]
pub struct ParseIdError {
    kind: &'static str,
    input: String,
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw storage identifier.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// The raw storage identifier.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }

            /// Storage identifiers are always strictly positive.
            #[must_use]
            pub const fn is_valid(self) -> bool {
                self.0 > 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<i64>()
                    .ok()
                    .filter(|id| *id > 0)
                    .map(Self)
                    .ok_or_else(|| ParseIdError {
                        kind: $kind,
                        input: s.to_string(),
                    })
            }
        }
    };
}

define_id!(
    /// Identifier of a row in the `recipes` table.
    RecipeId,
    "recipe"
);

define_id!(
    /// Identifier of a row in the `reviews` table.
    ReviewId,
    "review"
);

define_id!(
    /// Identifier of a row in the `users` table.
    UserId,
    "user"
);
