//! Feed error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    /// The diff's `prev_sequence_id` does not chain onto the book.
    /// The book is desynchronized and must be resnapshotted.
    #[error("Sequence gap: book at {expected:?}, diff expects {got}")]
    SequenceGap { expected: Option<u64>, got: u64 },

    /// A single price level could not be parsed. The level is skipped;
    /// the rest of the message is still processed.
    #[error("Malformed level: {0}")]
    MalformedLevel(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type FeedResult<T> = Result<T, FeedError>;
