//! RESP3 data types and value representation.

use std::fmt;

use bytes::Bytes;

/// Represents a decoded RESP3 value.
///
/// One variant per protocol type. Text and blob wire forms of the same type
/// collapse into a single variant: `+OK\r\n` and `$2\r\nOK\r\n` both decode
/// to [`RespValue::String`], and the encoder always emits the blob form
/// because it is binary-safe.
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    /// Array: `*2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n`
    Array(Vec<RespValue>),

    /// Attribute: `|1\r\n+ttl\r\n:3600\r\n` followed by the value it
    /// annotates. The metadata pairs ride along with the carried value
    /// instead of replacing it.
    Attribute {
        /// Metadata pairs in wire order.
        attrs: Vec<(RespValue, RespValue)>,
        /// The value the metadata is attached to.
        value: Box<RespValue>,
    },

    /// Big number: `(3492890328409238509324850943850943825024385\r\n`
    ///
    /// Kept as its decimal digit string; the protocol allows magnitudes no
    /// native integer holds.
    Bignum(Bytes),

    /// Boolean: `#t\r\n` or `#f\r\n`
    Boolean(bool),

    /// Double: `,3.14\r\n`, with `,inf\r\n`, `,-inf\r\n` and `,nan\r\n` for
    /// the non-finite values.
    Double(f64),

    /// Error: `-ERR message\r\n` or `!21\r\nSYNTAX invalid syntax\r\n`
    Error(Bytes),

    /// Integer: `:1000\r\n`
    Integer(i64),

    /// Map: `%2\r\n+first\r\n:1\r\n+second\r\n:2\r\n`
    ///
    /// Entries keep wire order. The protocol does not promise unique keys,
    /// so duplicates are preserved rather than merged.
    Map(Vec<(RespValue, RespValue)>),

    /// Null: `_\r\n`, plus the legacy spellings `$-1\r\n` and `*-1\r\n`
    Nil,

    /// Push: `>4\r\n+pubsub\r\n+message\r\n...\r\n`
    ///
    /// Same shape as an array, but a distinct type: pushes arrive out of
    /// band and consumers dispatch on the tag.
    Push(Vec<RespValue>),

    /// Set: `~5\r\n+orange\r\n+apple\r\n...\r\n`
    ///
    /// Membership is the server's concern; elements keep decode order.
    Set(Vec<RespValue>),

    /// String: `+OK\r\n` or `$6\r\nfoobar\r\n`. May hold arbitrary bytes.
    String(Bytes),

    /// Verbatim string: `=15\r\ntxt:Some string\r\n`
    Verbatim {
        /// Three-byte format tag, e.g. `txt` or `mkd`.
        format: Bytes,
        /// Payload after the `:` separator.
        data: Bytes,
    },
}

impl RespValue {
    /// The value's type tag.
    pub fn kind(&self) -> RespKind {
        match self {
            RespValue::Array(_) => RespKind::Array,
            RespValue::Attribute { .. } => RespKind::Attribute,
            RespValue::Bignum(_) => RespKind::Bignum,
            RespValue::Boolean(_) => RespKind::Boolean,
            RespValue::Double(_) => RespKind::Double,
            RespValue::Error(_) => RespKind::Error,
            RespValue::Integer(_) => RespKind::Integer,
            RespValue::Map(_) => RespKind::Map,
            RespValue::Nil => RespKind::Nil,
            RespValue::Push(_) => RespKind::Push,
            RespValue::Set(_) => RespKind::Set,
            RespValue::String(_) => RespKind::String,
            RespValue::Verbatim { .. } => RespKind::Verbatim,
        }
    }

    /// Check if the value is an error
    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }

    /// Check if the value is nil
    pub fn is_nil(&self) -> bool {
        matches!(self, RespValue::Nil)
    }

    /// Try to convert to a string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RespValue::String(s) => std::str::from_utf8(s).ok(),
            _ => None,
        }
    }

    /// Try to convert to bytes
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            RespValue::String(b) => Some(b),
            _ => None,
        }
    }

    /// Try to convert to integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RespValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to convert to array
    pub fn as_array(&self) -> Option<&Vec<RespValue>> {
        match self {
            RespValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Try to convert to boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RespValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to convert to double
    pub fn as_double(&self) -> Option<f64> {
        match self {
            RespValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Try to convert to map entries
    pub fn as_map(&self) -> Option<&Vec<(RespValue, RespValue)>> {
        match self {
            RespValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Convert to String with lossy UTF-8 conversion
    pub fn to_string_lossy(&self) -> Option<String> {
        match self {
            RespValue::String(s) => Some(String::from_utf8_lossy(s).into_owned()),
            _ => None,
        }
    }

    /// Try to consume and convert to Vec<RespValue>
    pub fn into_vec(self) -> Option<Vec<RespValue>> {
        match self {
            RespValue::Array(a) | RespValue::Push(a) => Some(a),
            _ => None,
        }
    }

    /// The value with attribute metadata peeled off.
    ///
    /// Attributes can nest (`|0` carrying another attribute), so this walks
    /// carried values until it reaches a non-attribute.
    pub fn without_attributes(&self) -> &RespValue {
        let mut value = self;
        while let RespValue::Attribute { value: inner, .. } = value {
            value = inner;
        }
        value
    }

    // Convenience constructors

    /// Create a string value
    pub fn string(s: impl Into<Bytes>) -> Self {
        RespValue::String(s.into())
    }

    /// Create an error value
    pub fn error(e: impl Into<Bytes>) -> Self {
        RespValue::Error(e.into())
    }

    /// Create an integer value
    pub fn integer(i: i64) -> Self {
        RespValue::Integer(i)
    }

    /// Create an array value from an iterator
    pub fn array(items: impl IntoIterator<Item = RespValue>) -> Self {
        RespValue::Array(items.into_iter().collect())
    }

    /// Create a map value from key/value pairs
    pub fn map(entries: impl IntoIterator<Item = (RespValue, RespValue)>) -> Self {
        RespValue::Map(entries.into_iter().collect())
    }

    /// Create a set value from an iterator
    pub fn set(items: impl IntoIterator<Item = RespValue>) -> Self {
        RespValue::Set(items.into_iter().collect())
    }

    /// Create a nil value
    pub fn nil() -> Self {
        RespValue::Nil
    }

    /// Attach attribute metadata to a value
    pub fn attribute(
        attrs: impl IntoIterator<Item = (RespValue, RespValue)>,
        value: RespValue,
    ) -> Self {
        RespValue::Attribute {
            attrs: attrs.into_iter().collect(),
            value: Box::new(value),
        }
    }
}

/// The type tag of a [`RespValue`], without its payload.
///
/// Lets callers dispatch on the shape of a reply before committing to a
/// payload pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RespKind {
    Array,
    Attribute,
    Bignum,
    Boolean,
    Double,
    Error,
    Integer,
    Map,
    Nil,
    Push,
    Set,
    String,
    Verbatim,
}

impl RespKind {
    /// Protocol name of the type.
    pub const fn name(self) -> &'static str {
        match self {
            RespKind::Array => "array",
            RespKind::Attribute => "attribute",
            RespKind::Bignum => "bignum",
            RespKind::Boolean => "boolean",
            RespKind::Double => "double",
            RespKind::Error => "error",
            RespKind::Integer => "integer",
            RespKind::Map => "map",
            RespKind::Nil => "nil",
            RespKind::Push => "push",
            RespKind::Set => "set",
            RespKind::String => "string",
            RespKind::Verbatim => "verbatim",
        }
    }
}

impl fmt::Display for RespKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Convenient From implementations
impl From<&str> for RespValue {
    fn from(s: &str) -> Self {
        RespValue::String(Bytes::from(s.to_string()))
    }
}

impl From<String> for RespValue {
    fn from(s: String) -> Self {
        RespValue::String(Bytes::from(s))
    }
}

impl From<&[u8]> for RespValue {
    fn from(b: &[u8]) -> Self {
        RespValue::String(Bytes::copy_from_slice(b))
    }
}

impl From<Vec<u8>> for RespValue {
    fn from(v: Vec<u8>) -> Self {
        RespValue::String(Bytes::from(v))
    }
}

impl From<i64> for RespValue {
    fn from(i: i64) -> Self {
        RespValue::Integer(i)
    }
}

impl From<i32> for RespValue {
    fn from(i: i32) -> Self {
        RespValue::Integer(i as i64)
    }
}

impl From<bool> for RespValue {
    fn from(b: bool) -> Self {
        RespValue::Boolean(b)
    }
}

impl From<f64> for RespValue {
    fn from(d: f64) -> Self {
        RespValue::Double(d)
    }
}

impl From<Bytes> for RespValue {
    fn from(b: Bytes) -> Self {
        RespValue::String(b)
    }
}

impl<T: Into<RespValue>> From<Vec<T>> for RespValue {
    fn from(v: Vec<T>) -> Self {
        RespValue::Array(v.into_iter().map(|x| x.into()).collect())
    }
}

impl<T: Into<RespValue>> From<Option<T>> for RespValue {
    fn from(o: Option<T>) -> Self {
        match o {
            Some(v) => v.into(),
            None => RespValue::Nil,
        }
    }
}
