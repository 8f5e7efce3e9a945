//! Streaming behavior: incomplete input never consumes bytes, and a message
//! split at any byte boundary decodes once the rest arrives.

use bytes::Bytes;
use bytes::BytesMut;
use resp3::DecodeOutcome;
use resp3::ProtocolErrorKind;
use resp3::RespDecoder;
use resp3::RespValue;
use rstest::rstest;

fn expect_complete(decoder: &RespDecoder, buf: &mut BytesMut) -> RespValue {
    match decoder.decode(buf) {
        DecodeOutcome::Complete(value) => value,
        other => panic!("Expected Complete, got {:?}", other),
    }
}

#[test]
fn test_one_shot_decode_incomplete() {
    let mut buf = BytesMut::new();
    buf.extend_from_slice(b"+HEL");

    // Whole-message decoding treats a short buffer as a hard error.
    let result = resp3::decode(&mut buf);
    assert!(matches!(result, Err(e) if e.kind == ProtocolErrorKind::UnexpectedEOF));

    // Try again with full data
    buf.extend_from_slice(b"LO\r\n");
    let result = resp3::decode(&mut buf);
    match result {
        Ok(RespValue::String(s)) => assert_eq!(s, "HELLO"),
        _ => panic!("Expected String(HELLO), got {:?}", result),
    }
}

#[test]
fn test_streaming_decode_leaves_buffer_untouched() {
    let decoder = RespDecoder::new();
    let mut buf = BytesMut::new();

    // Partial write
    buf.extend_from_slice(b"+HEL");
    let result = decoder.decode(&mut buf);
    assert!(matches!(result, DecodeOutcome::NeedMoreBytes));

    // Nothing was consumed while waiting
    assert_eq!(&buf[..], b"+HEL");

    // Complete the write
    buf.extend_from_slice(b"LO\r\n");
    let value = expect_complete(&decoder, &mut buf);
    assert_eq!(value, RespValue::string("HELLO"));
    assert!(buf.is_empty());
}

#[test]
fn test_streaming_array_split() {
    let decoder = RespDecoder::new();
    let mut buf = BytesMut::new();

    // *2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n

    // Write header *2\r\n plus a partial first element
    buf.extend_from_slice(b"*2\r\n");
    buf.extend_from_slice(b"$3\r\nf");

    let result = decoder.decode(&mut buf);
    assert!(matches!(result, DecodeOutcome::NeedMoreBytes));

    // Rest of the first element; still incomplete overall
    buf.extend_from_slice(b"oo\r\n");
    let result = decoder.decode(&mut buf);
    assert!(matches!(result, DecodeOutcome::NeedMoreBytes));

    // Finish the array
    buf.extend_from_slice(b"$3\r\nbar\r\n");
    let value = expect_complete(&decoder, &mut buf);
    if let RespValue::Array(arr) = value {
        assert_eq!(arr.len(), 2);
        assert_eq!(arr[0], RespValue::String(Bytes::from("foo")));
        assert_eq!(arr[1], RespValue::String(Bytes::from("bar")));
    } else {
        panic!("Expected Array, got {:?}", value);
    }
}

#[rstest]
#[case(b"+OK\r\n")]
#[case(b":1000\r\n")]
#[case(b"$6\r\nfoobar\r\n")]
#[case(b"(12345678901234567890\r\n")]
#[case(b"=15\r\ntxt:Some string\r\n")]
#[case(b"*2\r\n:1\r\n$2\r\nhi\r\n")]
#[case(b"%2\r\n+a\r\n:1\r\n+a\r\n:2\r\n")]
#[case(b"~2\r\n#t\r\n_\r\n")]
#[case(b">2\r\n$7\r\nmessage\r\n$5\r\nhello\r\n")]
#[case(b"|1\r\n$3\r\nkey\r\n$3\r\nval\r\n:42\r\n")]
fn test_decode_at_every_split_point(#[case] message: &[u8]) {
    let decoder = RespDecoder::new();

    let mut whole = BytesMut::from(message);
    let expected = expect_complete(&decoder, &mut whole);
    assert!(whole.is_empty());

    for split in 1..message.len() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&message[..split]);

        match decoder.decode(&mut buf) {
            DecodeOutcome::NeedMoreBytes => {}
            other => panic!("split {split}: expected NeedMoreBytes, got {other:?}"),
        }
        assert_eq!(
            &buf[..],
            &message[..split],
            "split {split}: buffer was touched"
        );

        buf.extend_from_slice(&message[split..]);
        match decoder.decode(&mut buf) {
            DecodeOutcome::Complete(value) => assert_eq!(value, expected, "split {split}"),
            other => panic!("split {split}: expected Complete, got {other:?}"),
        }
        assert!(buf.is_empty(), "split {split}: leftover bytes");
    }
}

#[rstest]
#[case(b"")]
#[case(b"*")]
#[case(b"*2\r\n")]
#[case(b"*2\r\n:1\r\n")]
#[case(b"$10\r\nabc")]
#[case(b"$3\r\nabc")]
#[case(b"$3\r\nabc\r")]
#[case(b":12\r")]
#[case(b"+OK\r")]
#[case(b"|1\r\n+a\r\n:1\r\n")]
fn test_incomplete_inputs_need_more_bytes(#[case] input: &[u8]) {
    let decoder = RespDecoder::new();
    let mut buf = BytesMut::from(input);

    match decoder.decode(&mut buf) {
        DecodeOutcome::NeedMoreBytes => {}
        other => panic!("Expected NeedMoreBytes, got {:?}", other),
    }
    assert_eq!(&buf[..], input);
}

#[test]
fn test_pipelined_replies_decode_in_sequence() {
    let decoder = RespDecoder::new();
    let mut buf = BytesMut::from(&b"+OK\r\n:7\r\n$3\r\nabc\r\n+par"[..]);

    assert_eq!(expect_complete(&decoder, &mut buf), RespValue::string("OK"));
    assert_eq!(expect_complete(&decoder, &mut buf), RespValue::Integer(7));
    assert_eq!(expect_complete(&decoder, &mut buf), RespValue::string("abc"));

    // The trailing partial reply waits for more bytes.
    let result = decoder.decode(&mut buf);
    assert!(matches!(result, DecodeOutcome::NeedMoreBytes));
    assert_eq!(&buf[..], b"+par");
}

#[test]
fn test_trailing_bytes_stay_in_buffer() {
    let decoder = RespDecoder::new();
    let mut buf = BytesMut::from(&b"_\r\nleftover"[..]);

    let value = expect_complete(&decoder, &mut buf);
    assert!(value.is_nil());
    assert_eq!(&buf[..], b"leftover");
}

#[test]
fn test_error_repeats_without_consuming() {
    let decoder = RespDecoder::new();
    let mut buf = BytesMut::from(&b"^junk\r\n"[..]);

    // A grammar violation is not consumed; retrying reports it again, so a
    // caller that ignores errors cannot silently skip bytes.
    for _ in 0..2 {
        match decoder.decode(&mut buf) {
            DecodeOutcome::Error(err) => {
                assert_eq!(err.kind, ProtocolErrorKind::InvalidTypeMarker('^'));
            }
            other => panic!("Expected Error, got {:?}", other),
        }
    }
    assert_eq!(&buf[..], b"^junk\r\n");
}
