#![forbid(unsafe_code)]

//! Error types shared across the workspace.
//!
//! | Error | Raised by | Handling |
//! |-------|-----------|----------|
//! | [`IndexOutOfBounds`] | buffer `at` / `first` / `last` | Mapped to `None` by the record store |
//! | [`FetchError`] | any rejected [`Client`](crate::Client) fetch | Logged, treated as zero records |
//!
//! There is no subscription error: `subscribe` is expected never to fail.

use std::fmt;

/// Buffer access outside `[0, len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOutOfBounds {
    /// The requested logical index.
    pub index: usize,
    /// Buffer length at the time of the access.
    pub len: usize,
}

impl fmt::Display for IndexOutOfBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index {} out of bounds for length {}", self.index, self.len)
    }
}

impl std::error::Error for IndexOutOfBounds {}

/// A rejected client call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The transport failed; carries a human-readable reason.
    Transport(String),
    /// The client was shut down before answering.
    Closed,
}

impl FetchError {
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport(reason.into())
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(reason) => write!(f, "transport error: {reason}"),
            Self::Closed => f.write_str("client closed"),
        }
    }
}

impl std::error::Error for FetchError {}
