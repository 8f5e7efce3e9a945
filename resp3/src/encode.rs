//! RESP3 encoder.

use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;

use crate::error::EncodeError;
use crate::value::RespValue;
use crate::wire;

/// Trait for encoding RESP3 values.
pub trait RespEncoder {
    /// Append the wire form of `self` to `buf`.
    ///
    /// On error the buffer may already hold a partial frame; [`encode`]
    /// discards partial output instead.
    ///
    /// [`encode`]: RespEncoder::encode
    fn encode_to(&self, buf: &mut BytesMut) -> Result<(), EncodeError>;

    /// Encode into a fresh buffer.
    fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut buf = BytesMut::new();
        self.encode_to(&mut buf)?;
        Ok(buf.freeze())
    }
}

impl RespEncoder for RespValue {
    fn encode_to(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        // Children are pushed in reverse so pop order is wire order. The
        // explicit stack keeps deeply nested values off the call stack.
        let mut stack: Vec<&RespValue> = vec![self];

        while let Some(value) = stack.pop() {
            match value {
                RespValue::Array(arr) => {
                    encode_length(buf, wire::ARRAY, arr.len());
                    stack.extend(arr.iter().rev());
                }
                RespValue::Attribute { attrs, value } => {
                    encode_length(buf, wire::ATTRIBUTE, attrs.len());
                    // Carried value goes out after the metadata pairs.
                    stack.push(value);
                    for (key, val) in attrs.iter().rev() {
                        stack.push(val);
                        stack.push(key);
                    }
                }
                RespValue::Bignum(n) => encode_bignum(buf, n)?,
                RespValue::Boolean(b) => encode_boolean(buf, *b),
                RespValue::Double(d) => encode_double(buf, *d),
                RespValue::Error(e) => encode_bulk(buf, wire::BULK_ERROR, e),
                RespValue::Integer(i) => encode_integer(buf, *i),
                RespValue::Map(m) => {
                    encode_length(buf, wire::MAP, m.len());
                    for (key, val) in m.iter().rev() {
                        stack.push(val);
                        stack.push(key);
                    }
                }
                RespValue::Nil => encode_nil(buf),
                RespValue::Push(p) => {
                    encode_length(buf, wire::PUSH, p.len());
                    stack.extend(p.iter().rev());
                }
                RespValue::Set(s) => {
                    encode_length(buf, wire::SET, s.len());
                    stack.extend(s.iter().rev());
                }
                RespValue::String(s) => encode_bulk(buf, wire::BULK_STRING, s),
                RespValue::Verbatim { format, data } => encode_verbatim(buf, format, data)?,
            }
        }

        Ok(())
    }
}

#[inline]
fn encode_length(buf: &mut BytesMut, marker: u8, length: usize) {
    buf.put_u8(marker);
    buf.put_slice(length.to_string().as_bytes());
    buf.put_slice(wire::CRLF);
}

/// Length-prefixed payload. Binary-safe, so embedded CRLF round-trips.
#[inline]
fn encode_bulk(buf: &mut BytesMut, marker: u8, payload: &Bytes) {
    encode_length(buf, marker, payload.len());
    buf.put_slice(payload);
    buf.put_slice(wire::CRLF);
}

#[inline]
fn encode_integer(buf: &mut BytesMut, i: i64) {
    buf.put_u8(wire::INTEGER);
    buf.put_slice(i.to_string().as_bytes());
    buf.put_slice(wire::CRLF);
}

#[inline]
fn encode_nil(buf: &mut BytesMut) {
    buf.put_u8(wire::NIL);
    buf.put_slice(wire::CRLF);
}

#[inline]
fn encode_boolean(buf: &mut BytesMut, b: bool) {
    buf.put_u8(wire::BOOLEAN);
    buf.put_u8(if b { b't' } else { b'f' });
    buf.put_slice(wire::CRLF);
}

#[inline]
fn encode_double(buf: &mut BytesMut, d: f64) {
    buf.put_u8(wire::DOUBLE);
    if d.is_nan() {
        buf.put_slice(b"nan");
    } else if d.is_infinite() {
        if d.is_sign_positive() {
            buf.put_slice(b"inf");
        } else {
            buf.put_slice(b"-inf");
        }
    } else {
        buf.put_slice(d.to_string().as_bytes());
    }
    buf.put_slice(wire::CRLF);
}

#[inline]
fn encode_bignum(buf: &mut BytesMut, n: &Bytes) -> Result<(), EncodeError> {
    if !wire::is_valid_bignum(n) {
        return Err(EncodeError::InvalidBignum(wire::lossy(n)));
    }
    buf.put_u8(wire::BIGNUM);
    buf.put_slice(n);
    buf.put_slice(wire::CRLF);
    Ok(())
}

#[inline]
fn encode_verbatim(buf: &mut BytesMut, format: &Bytes, data: &Bytes) -> Result<(), EncodeError> {
    if format.len() != 3 {
        return Err(EncodeError::InvalidVerbatimFormat(format.len()));
    }
    let total_len = 4 + data.len();
    encode_length(buf, wire::VERBATIM, total_len);
    buf.put_slice(format);
    buf.put_u8(b':');
    buf.put_slice(data);
    buf.put_slice(wire::CRLF);
    Ok(())
}
