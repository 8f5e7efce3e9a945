//! # RESP3 - Redis Serialization Protocol v3 Library
//!
//! An in-memory value model and streaming wire codec for RESP3, the reply
//! protocol spoken by Redis-family servers.
//!
//! Every RESP3 reply type is represented by one variant of [`RespValue`].
//! The decoder turns raw bytes into values without blocking: a partial
//! message leaves the buffer untouched, so callers append more bytes and
//! retry. The encoder maps any value back to conformant wire bytes.
//!
//! ## Features
//!
//! - **Complete RESP3 coverage**: arrays, maps with duplicate keys, sets,
//!   pushes, attributes, verbatim strings, big numbers, doubles with the
//!   `inf`/`-inf`/`nan` spellings
//! - **Streaming-safe decoding**: incomplete input is a retry signal, never
//!   an error or a lost position
//! - **Hostile-input hardening**: configurable nesting depth and bulk length
//!   limits, no recursion on either codec path
//!
//! ## Example
//!
//! ```rust
//! use bytes::BytesMut;
//! use resp3::{DecodeOutcome, RespDecoder, RespEncoder, RespValue};
//!
//! let decoder = RespDecoder::new();
//! let mut buf = BytesMut::from(&b"*2\r\n:1\r\n$2\r\nhi\r\n"[..]);
//!
//! let value = match decoder.decode(&mut buf) {
//!     DecodeOutcome::Complete(value) => value,
//!     other => panic!("expected a complete reply, got {other:?}"),
//! };
//! assert_eq!(
//!     value,
//!     RespValue::Array(vec![RespValue::Integer(1), RespValue::string("hi")])
//! );
//!
//! // Values encode back to the bytes they came from.
//! assert_eq!(value.encode().unwrap(), b"*2\r\n:1\r\n$2\r\nhi\r\n".as_slice());
//! ```

mod decode;
mod encode;
mod error;
mod value;
mod wire;

pub use decode::DecodeConfig;
pub use decode::DecodeOutcome;
pub use decode::RespDecoder;
pub use decode::decode;
pub use encode::RespEncoder;
pub use error::EncodeError;
pub use error::ProtocolError;
pub use error::ProtocolErrorKind;
pub use value::RespKind;
pub use value::RespValue;
