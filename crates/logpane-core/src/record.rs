#![forbid(unsafe_code)]

//! Log records and the windowed-fetch value types.

use crate::cursor::Cursor;

/// Where a record came from. Every field is optional; transports fill in
/// what they know.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceMeta {
    pub node: Option<String>,
    pub namespace: Option<String>,
    pub pod: Option<String>,
    pub container: Option<String>,
}

/// A single fetched log line. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogRecord {
    /// Opaque timestamp string (ISO-8601 in the reference client).
    pub timestamp: String,
    pub message: String,
    pub cursor: Cursor,
    pub source: SourceMeta,
}

impl LogRecord {
    /// Create a record with empty source metadata.
    #[must_use]
    pub fn new(timestamp: impl Into<String>, message: impl Into<String>, cursor: Cursor) -> Self {
        Self {
            timestamp: timestamp.into(),
            message: message.into(),
            cursor,
            source: SourceMeta::default(),
        }
    }

    /// Attach source metadata.
    #[must_use]
    pub fn with_source(mut self, source: SourceMeta) -> Self {
        self.source = source;
        self
    }
}

/// Stable render identity assigned by the record store.
///
/// Keys are never reused, so a key always identifies the same content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecordKey(pub u64);

/// A [`LogRecord`] plus its store-assigned key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalRecord {
    pub key: RecordKey,
    pub record: LogRecord,
}

impl InternalRecord {
    #[must_use]
    pub fn cursor(&self) -> &Cursor {
        &self.record.cursor
    }
}

/// Which of the four windowed fetch operations a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// Inclusive, forward from the cursor.
    Since,
    /// Inclusive, the last `limit` records up to the cursor.
    Until,
    /// Exclusive, forward from the cursor.
    After,
    /// Exclusive, the last `limit` records before the cursor.
    Before,
}

impl Direction {
    /// Short lowercase label for logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Since => "since",
            Self::Until => "until",
            Self::After => "after",
            Self::Before => "before",
        }
    }
}

/// Arguments to a windowed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FetchRequest {
    /// Bound for the window; `None` means the matching end of the log.
    pub cursor: Option<Cursor>,
    /// Maximum records to return. `usize::MAX` means unbounded.
    pub limit: usize,
}

impl FetchRequest {
    #[must_use]
    pub fn new(cursor: Option<Cursor>, limit: usize) -> Self {
        Self { cursor, limit }
    }

    /// Request without a cursor bound.
    #[must_use]
    pub fn limit(limit: usize) -> Self {
        Self {
            cursor: None,
            limit,
        }
    }

    /// Request bounded by `cursor`.
    #[must_use]
    pub fn at(cursor: Cursor, limit: usize) -> Self {
        Self {
            cursor: Some(cursor),
            limit,
        }
    }

    /// Unbounded request over the whole log.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::limit(usize::MAX)
    }
}

/// Result of a windowed fetch.
///
/// `next_cursor == None` means nothing remains beyond the window in the
/// requested direction. Otherwise it names the first unconsumed record on
/// that side, suitable for a follow-up `fetch_since` / `fetch_until`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FetchResult {
    pub records: Vec<LogRecord>,
    pub next_cursor: Option<Cursor>,
}

impl FetchResult {
    /// An empty result with no continuation.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }
}
