#![no_main]

use http11_toolkit::uri::{Uri, percent_decode, percent_encode, resolve};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // UTF-8 文字列として解釈できる場合のみテスト
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(uri) = Uri::parse(s) {
            let _ = uri.scheme();
            let _ = uri.authority();
            let _ = uri.port_or_default();
            let _ = uri.origin_form();

            if let Ok(reparsed) = Uri::parse(&uri.to_string()) {
                let _ = reparsed.to_string();
            }

            // 基底としても参照としても使う
            if uri.is_absolute() {
                let _ = resolve(&uri, "../a/./b?c#d");
            }
            if let Ok(base) = Uri::parse("http://example.com/a/b/c") {
                let _ = resolve(&base, s);
            }
        }

        let encoded = percent_encode(s);
        assert_eq!(percent_decode(&encoded).ok().as_deref(), Some(s), "roundtrip failed");
        let _ = percent_decode(s);
    }
});
