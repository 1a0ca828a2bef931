#![no_main]

use std::io::Cursor;

use http11_toolkit::{HttpMessage, ResponseDecoder, TransportLimits};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // 通常のデコード
    if let Ok(response) = ResponseDecoder::new().read_response(&mut Cursor::new(data)) {
        let _ = response.status_code();
        let _ = response.content_length();
        let _ = response.raw_message();
    }

    // chunked を解除しない
    let _ = ResponseDecoder::new()
        .dechunk(false)
        .decode(false)
        .read_response(&mut Cursor::new(data));

    // 小さな制限
    let limits = TransportLimits {
        max_line_size: 64,
        max_headers_count: 4,
        max_body_size: 256,
    };
    let decoder = ResponseDecoder::with_limits(limits);
    if let Ok(response) = decoder.read_response(&mut Cursor::new(data)) {
        assert!(response.headers().len() <= 4);
        assert!(response.body().len() <= 256);
    }
});
