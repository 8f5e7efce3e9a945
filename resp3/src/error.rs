//! Error types for RESP3 decoding and encoding.

use thiserror::Error;

/// A RESP3 grammar violation.
///
/// Once a stream produces one of these it cannot be resynchronized; the
/// connection it came from should be torn down.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} at byte {offset}")]
pub struct ProtocolError {
    /// Offset of the offending byte, counted from the read position at the
    /// start of the decode call.
    pub offset: usize,
    /// What was wrong with the stream.
    pub kind: ProtocolErrorKind,
}

impl ProtocolError {
    pub(crate) fn new(offset: usize, kind: ProtocolErrorKind) -> Self {
        Self { offset, kind }
    }
}

/// The ways a byte stream can violate the RESP3 grammar.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolErrorKind {
    /// A frame began with a byte that is not a type marker
    #[error("Invalid type marker: {0:?}")]
    InvalidTypeMarker(char),

    /// Invalid format for the current type
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Integer or length line that is not decimal text
    #[error("Invalid integer: {0:?}")]
    InvalidInteger(String),

    /// Double line that is not numeric text or a non-finite sentinel
    #[error("Invalid double: {0:?}")]
    InvalidDouble(String),

    /// Boolean line other than `t` or `f`
    #[error("Invalid boolean: {0:?}")]
    InvalidBoolean(String),

    /// Big number line that is not an optionally signed digit run
    #[error("Invalid big number: {0:?}")]
    InvalidBignum(String),

    /// A declared length that makes no sense for its frame type
    #[error("Invalid declared length: {0}")]
    InvalidLength(i64),

    /// A declared bulk length above the configured limit
    #[error("Declared length {len} exceeds limit {limit}")]
    LengthLimitExceeded { len: u64, limit: usize },

    /// A CR or LF that does not form the CRLF frame terminator
    #[error("Malformed line terminator")]
    InvalidTerminator,

    /// Aggregate nesting deeper than the configured limit
    #[error("Nesting depth exceeds limit {0}")]
    DepthLimitExceeded(usize),

    /// Input ended inside a message. Only the whole-message entry point
    /// reports this; the streaming decoder asks for more bytes instead.
    #[error("Unexpected end of input")]
    UnexpectedEOF,
}

/// A value that cannot be represented on the wire.
///
/// Decoded values never trip these; they only come from hand-built values
/// that break a type's wire invariant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// Verbatim format tags are exactly three bytes on the wire
    #[error("Verbatim format tag must be 3 bytes, got {0}")]
    InvalidVerbatimFormat(usize),

    /// Big numbers are optionally signed decimal digit runs
    #[error("Big number is not a decimal digit string: {0:?}")]
    InvalidBignum(String),
}
