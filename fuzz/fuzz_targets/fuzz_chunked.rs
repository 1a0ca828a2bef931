#![no_main]

use std::io::Cursor;

use arbitrary::Arbitrary;
use http11_toolkit::{HttpMessage, ResponseDecoder};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct FuzzChunked {
    chunks: Vec<Vec<u8>>,
    uppercase: bool,
    extension: bool,
}

fuzz_target!(|input: FuzzChunked| {
    let chunks: Vec<Vec<u8>> = input
        .chunks
        .into_iter()
        .filter(|chunk| !chunk.is_empty())
        .take(64)
        .collect();

    let mut raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n".to_vec();
    for chunk in &chunks {
        let size = if input.uppercase {
            format!("{:X}", chunk.len())
        } else {
            format!("{:x}", chunk.len())
        };
        raw.extend_from_slice(size.as_bytes());
        if input.extension {
            raw.extend_from_slice(b";ext=1");
        }
        raw.extend_from_slice(b"\r\n");
        raw.extend_from_slice(chunk);
        raw.extend_from_slice(b"\r\n");
    }
    raw.extend_from_slice(b"0\r\n\r\n");

    let response = ResponseDecoder::new()
        .read_response(&mut Cursor::new(&raw))
        .expect("well-formed chunked response must decode");
    assert_eq!(response.body().as_bytes(), chunks.concat().as_slice());
});
