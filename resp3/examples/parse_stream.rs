use bytes::BytesMut;
use resp3::DecodeOutcome;
use resp3::RespDecoder;

fn main() {
    println!("--- RESP3 Streaming Decode Example ---");

    // Simulate a TCP stream with fragmented replies:
    // - A String: "+OK\r\n"
    // - An Integer: ":1000\r\n"
    // - A Map with an attribute: "|1\r\n$3\r\nttl\r\n:3600\r\n%1\r\n$4\r\nname\r\n$5\r\nalice\r\n"
    // - But split into arbitrary chunks.
    let data_chunks = vec![
        b"+O".as_slice(),
        b"K\r\n:1".as_slice(),
        b"00".as_slice(),
        b"0\r\n|1\r\n$3\r\nttl\r\n:36".as_slice(),
        b"00\r\n%1\r\n$4\r\nna".as_slice(),
        b"me\r\n$5\r\nalice\r\n".as_slice(),
    ];

    let decoder = RespDecoder::new();
    let mut buffer = BytesMut::new();

    for (i, chunk) in data_chunks.iter().enumerate() {
        println!("\n[Stream] Received Chunk {}: {:?}", i, chunk);

        buffer.extend_from_slice(chunk);

        loop {
            // Attempt to decode
            match decoder.decode(&mut buffer) {
                DecodeOutcome::Complete(value) => {
                    println!("[Decoder] Complete: {:?}", value);
                    // Keep going in case the buffer holds more full replies
                }
                DecodeOutcome::NeedMoreBytes => {
                    println!("[Decoder] Incomplete, waiting for more data...");
                    break;
                }
                DecodeOutcome::Error(e) => {
                    eprintln!("[Decoder] Error: {}", e);
                    break;
                }
            }
        }
    }
}
