#![no_main]

use http11_toolkit::date::HttpDate;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // UTF-8 文字列として解釈できる場合のみテスト
    if let Ok(s) = std::str::from_utf8(data) {
        for date in [HttpDate::parse(s), HttpDate::parse_lenient(s)]
            .into_iter()
            .flatten()
        {
            let _ = date.day_of_week();
            let unix = date.to_unix_time();

            // IMF-fixdate で書き出したものは同じ時刻に戻る
            if let Ok(reparsed) = HttpDate::parse(&date.to_string()) {
                assert_eq!(reparsed.to_unix_time(), unix);
            }
            if date.year() < 9999 {
                assert_eq!(HttpDate::from_unix_time(unix).to_unix_time(), unix);
            }
        }
    }
});
