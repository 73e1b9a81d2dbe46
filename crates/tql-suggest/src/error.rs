//! Errors for misuse of the suggestion API.

use thiserror::Error;

/// A caller passed arguments that no query text can make sense of.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SuggestError {
    /// The cursor lies past the end of the input or inside a multi-byte character.
    #[error("cursor {index} is outside the input (length {len}) or not on a character boundary")]
    CursorOutOfBounds {
        /// The offending cursor offset.
        index: usize,
        /// Input length in bytes.
        len: usize,
    },

    /// A completion's range does not fit the input it is applied to.
    #[error("range {start}..{end} does not fit an input of length {len}")]
    RangeOutOfBounds {
        /// Range start.
        start: usize,
        /// Range end.
        end: usize,
        /// Input length in bytes.
        len: usize,
    },

    /// A completion value is quoted on one side only.
    #[error("completion value {value:?} is partially quoted")]
    PartiallyQuoted {
        /// The completion value.
        value: String,
    },
}
