//! Error types shared by the event engine, the tree builder and every codec.
//!
//! Errors fall into three families that callers can tell apart with
//! [`Error::kind`] instead of parsing messages:
//!
//! - **Structure**: the begin/end contract of the event engine was violated
//!   (unbalanced containers, a dangling object key, a key type the format forbids)
//! - **Syntax**: the input bytes are not valid for the wire format (bad tag,
//!   unterminated string, truncated length field); carries the byte offset
//! - **Range**: a value or size cannot be represented by the target format, or
//!   the writer lacks a capability the caller relied on
//!
//! Every error is fatal for the conversion in progress; partial output must be
//! discarded by the caller.
//!
//! ## Examples
//!
//! ```rust
//! use valuestream::{from_json, ErrorKind};
//!
//! let err = from_json("[1, 2").unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::Syntax);
//! assert!(err.to_string().contains("offset"));
//! ```

use std::fmt;
use thiserror::Error;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Event-engine contract violation.
    Structure,
    /// Malformed input for the wire format.
    Syntax,
    /// Value, size or capability out of range for the format.
    Range,
    /// Failure of the underlying byte sink.
    Io,
    /// Anything raised through serde or by user code.
    Custom,
}

/// Represents all possible errors raised while parsing or writing values.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Unbalanced begin/end calls, dangling keys, forbidden key types.
    #[error("Structural error: {0}")]
    Structure(String),

    /// Malformed input.
    #[error("{format} syntax error at offset {offset}: {msg}")]
    Syntax {
        format: &'static str,
        offset: usize,
        msg: String,
    },

    /// Input ended in the middle of a value.
    #[error("{format}: unexpected end of input at offset {offset}, expected {expected}")]
    UnexpectedEof {
        format: &'static str,
        offset: usize,
        expected: String,
    },

    /// Value or size not representable, or a missing writer capability.
    #[error("{format}: {msg}")]
    Range { format: &'static str, msg: String },

    /// IO error from the output sink.
    #[error("IO error: {0}")]
    Io(String),

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),
}

impl Error {
    /// Creates a structural error.
    ///
    /// ```rust
    /// use valuestream::{Error, ErrorKind};
    ///
    /// let err = Error::structure("end of array while an object is open");
    /// assert_eq!(err.kind(), ErrorKind::Structure);
    /// ```
    pub fn structure<T: fmt::Display>(msg: T) -> Self {
        Error::Structure(msg.to_string())
    }

    /// Creates a syntax error for `format` at byte `offset`.
    pub fn syntax<T: fmt::Display>(format: &'static str, offset: usize, msg: T) -> Self {
        Error::Syntax {
            format,
            offset,
            msg: msg.to_string(),
        }
    }

    /// Creates an unexpected end-of-input error.
    pub fn unexpected_eof(format: &'static str, offset: usize, expected: &str) -> Self {
        Error::UnexpectedEof {
            format,
            offset,
            expected: expected.to_string(),
        }
    }

    /// Creates a range error: the value cannot be represented by `format`.
    pub fn range<T: fmt::Display>(format: &'static str, msg: T) -> Self {
        Error::Range {
            format,
            msg: msg.to_string(),
        }
    }

    /// Creates a capability error raised by the event engine.
    pub fn capability<T: fmt::Display>(msg: T) -> Self {
        Error::Range {
            format: "stream",
            msg: msg.to_string(),
        }
    }

    /// Creates a custom error with a display message.
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Creates an I/O error for sink failures.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }

    /// Returns the family this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Structure(_) => ErrorKind::Structure,
            Error::Syntax { .. } | Error::UnexpectedEof { .. } => ErrorKind::Syntax,
            Error::Range { .. } => ErrorKind::Range,
            Error::Io(_) => ErrorKind::Io,
            Error::Custom(_) => ErrorKind::Custom,
        }
    }

    /// Byte offset of a syntax error, when known.
    #[must_use]
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::Syntax { offset, .. } | Error::UnexpectedEof { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(Error::structure("x").kind(), ErrorKind::Structure);
        assert_eq!(Error::syntax("json", 3, "x").kind(), ErrorKind::Syntax);
        assert_eq!(Error::unexpected_eof("cbor", 9, "a value").kind(), ErrorKind::Syntax);
        assert_eq!(Error::range("bson", "x").kind(), ErrorKind::Range);
        assert_eq!(Error::capability("x").kind(), ErrorKind::Range);
        assert_eq!(Error::custom("x").kind(), ErrorKind::Custom);
    }

    #[test]
    fn test_offset_and_message() {
        let err = Error::syntax("msgpack", 17, "reserved tag 0xc1");
        assert_eq!(err.offset(), Some(17));
        assert_eq!(
            err.to_string(),
            "msgpack syntax error at offset 17: reserved tag 0xc1"
        );
        assert_eq!(Error::range("json", "NaN").offset(), None);
    }
}
