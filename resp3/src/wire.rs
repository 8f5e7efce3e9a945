//! Wire-level constants and numeric text parsing for RESP3.

use crate::error::ProtocolErrorKind;

/// CRLF line ending
pub const CRLF: &[u8] = b"\r\n";

/// Type markers shared with RESP2
pub const SIMPLE_STRING: u8 = b'+';
pub const SIMPLE_ERROR: u8 = b'-';
pub const INTEGER: u8 = b':';
pub const BULK_STRING: u8 = b'$';
pub const ARRAY: u8 = b'*';

/// Type markers introduced by RESP3
pub const NIL: u8 = b'_';
pub const BOOLEAN: u8 = b'#';
pub const DOUBLE: u8 = b',';
pub const BIGNUM: u8 = b'(';
pub const BULK_ERROR: u8 = b'!';
pub const VERBATIM: u8 = b'=';
pub const MAP: u8 = b'%';
pub const SET: u8 = b'~';
pub const ATTRIBUTE: u8 = b'|';
pub const PUSH: u8 = b'>';

/// Lossy UTF-8 copy of offending wire text, for error reporting.
pub fn lossy(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf).into_owned()
}

/// Parse an integer line. Also used for the length headers of bulk and
/// aggregate frames.
#[inline]
pub fn parse_integer(buf: &[u8]) -> Result<i64, ProtocolErrorKind> {
    std::str::from_utf8(buf)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| ProtocolErrorKind::InvalidInteger(lossy(buf)))
}

/// Parse a double line.
///
/// `inf`, `-inf` and `nan` are the protocol's spellings for the non-finite
/// values.
#[inline]
pub fn parse_double(buf: &[u8]) -> Result<f64, ProtocolErrorKind> {
    match buf {
        b"inf" => Ok(f64::INFINITY),
        b"-inf" => Ok(f64::NEG_INFINITY),
        b"nan" => Ok(f64::NAN),
        _ => std::str::from_utf8(buf)
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| ProtocolErrorKind::InvalidDouble(lossy(buf))),
    }
}

/// Big numbers are an optionally signed run of decimal digits.
#[inline]
pub fn is_valid_bignum(buf: &[u8]) -> bool {
    let digits = match buf.first() {
        Some(b'+') | Some(b'-') => &buf[1..],
        _ => buf,
    };
    !digits.is_empty() && digits.iter().all(u8::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer(b"123").unwrap(), 123);
        assert_eq!(parse_integer(b"-456").unwrap(), -456);
        assert_eq!(parse_integer(b"+7").unwrap(), 7);

        let err = parse_integer(b"12a").unwrap_err();
        assert_eq!(err, ProtocolErrorKind::InvalidInteger("12a".to_string()));
        assert!(parse_integer(b"").is_err());
        assert!(parse_integer(b"1.5").is_err());
    }

    #[test]
    fn test_parse_double() {
        assert_eq!(parse_double(b"3.14").unwrap(), 3.14);
        assert_eq!(parse_double(b"-2.5").unwrap(), -2.5);
        assert_eq!(parse_double(b"10").unwrap(), 10.0);
        assert_eq!(parse_double(b"1e3").unwrap(), 1000.0);
        assert_eq!(parse_double(b"inf").unwrap(), f64::INFINITY);
        assert_eq!(parse_double(b"-inf").unwrap(), f64::NEG_INFINITY);
        assert!(parse_double(b"nan").unwrap().is_nan());

        let err = parse_double(b"abc").unwrap_err();
        assert_eq!(err, ProtocolErrorKind::InvalidDouble("abc".to_string()));
    }

    #[test]
    fn test_is_valid_bignum() {
        assert!(is_valid_bignum(b"0"));
        assert!(is_valid_bignum(b"3492890328409238509324850943850943825024385"));
        assert!(is_valid_bignum(b"-123"));
        assert!(is_valid_bignum(b"+123"));

        assert!(!is_valid_bignum(b""));
        assert!(!is_valid_bignum(b"+"));
        assert!(!is_valid_bignum(b"-"));
        assert!(!is_valid_bignum(b"12a"));
        assert!(!is_valid_bignum(b"1.5"));
        assert!(!is_valid_bignum(b" 1"));
    }
}
