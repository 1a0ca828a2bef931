#![no_main]

use http11_toolkit::cookie::{Cookie, SetCookie, format_cookie_header};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // UTF-8 文字列として解釈できる場合のみテスト
    if let Ok(s) = std::str::from_utf8(data) {
        let cookies = Cookie::parse(s);
        for cookie in &cookies {
            assert!(!cookie.name().is_empty());
        }
        let _ = format_cookie_header(&cookies);

        if let Ok(set_cookie) = SetCookie::parse(s) {
            let _ = set_cookie.expires();
            let _ = set_cookie.is_expired_at(0);

            // 書き出した Set-Cookie は同じ名前と値で読み戻せる
            let displayed = set_cookie.to_string();
            if let Ok(reparsed) = SetCookie::parse(&displayed) {
                assert_eq!(set_cookie.name(), reparsed.name());
                assert_eq!(set_cookie.secure(), reparsed.secure());
                assert_eq!(set_cookie.http_only(), reparsed.http_only());
            }
        }

        let _ = SetCookie::encoded(s, s).to_string();
    }
});
