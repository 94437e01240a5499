#![forbid(unsafe_code)]

//! Opaque pagination cursors.
//!
//! A [`Cursor`] addresses a position in the log sequence. The only properties
//! the engine relies on are total ordering and round-trip equality; the
//! reference client happens to use ISO-8601 timestamps as cursor values, but
//! nothing downstream parses them.
//!
//! # Ordering
//!
//! [`Cursor::Beginning`] sorts before every [`Cursor::At`] value. `At` values
//! compare by native string order.

use std::fmt;

/// Opaque, totally ordered pagination token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Cursor {
    /// Sentinel that compares less than every other cursor.
    Beginning,
    /// A concrete position in the log.
    At(String),
}

impl Cursor {
    /// Build a cursor at the given position.
    #[must_use]
    pub fn at(value: impl Into<String>) -> Self {
        Self::At(value.into())
    }

    /// True for the [`Cursor::Beginning`] sentinel.
    #[must_use]
    pub const fn is_beginning(&self) -> bool {
        matches!(self, Self::Beginning)
    }

    /// The raw token, or `None` for the sentinel.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Beginning => None,
            Self::At(value) => Some(value),
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Beginning => f.write_str("BEGINNING"),
            Self::At(value) => f.write_str(value),
        }
    }
}

impl From<&str> for Cursor {
    fn from(value: &str) -> Self {
        Self::At(value.to_owned())
    }
}

impl From<String> for Cursor {
    fn from(value: String) -> Self {
        Self::At(value)
    }
}
