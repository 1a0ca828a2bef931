//! PBT テスト共通ユーティリティ

use proptest::prelude::*;

// ========================================
// URI 構成要素
// ========================================

/// ホスト名: `[a-z0-9]` で始まり `.` と `-` を含んでよい
pub fn host() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z0-9]{1,16}".prop_map(|s| s),
        "[a-z0-9]{1,8}\\.[a-z]{2,4}".prop_map(|s| s),
        "[a-z0-9]{1,8}-[a-z0-9]{1,8}\\.[a-z]{2,4}".prop_map(|s| s),
    ]
}

/// パスセグメント (. と .. を除外)
pub fn path_segment() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9._-]{1,16}".prop_filter("exclude . and ..", |s| s != "." && s != "..")
}

/// 絶対パス (`/` で始まる)
pub fn absolute_path() -> impl Strategy<Value = String> {
    proptest::collection::vec(path_segment(), 0..=3).prop_map(|segments| {
        if segments.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", segments.join("/"))
        }
    })
}

/// `k=v&k=v` 形式のクエリ
pub fn query() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-z]{1,8}=[a-z0-9]{0,8}", 0..=3).prop_map(|pairs| pairs.join("&"))
}

// ========================================
// ヘッダー
// ========================================

/// ヘッダー名 (token)
pub fn header_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9-]{0,15}".prop_map(|s| s)
}

/// ヘッダー値 (CR / LF を含まない可視文字と空白)
pub fn header_value() -> impl Strategy<Value = String> {
    "[!-~][ -~]{0,31}".prop_map(|s| s.trim_end().to_string())
}

// ========================================
// Cookie
// ========================================

/// Cookie 名 (token)
pub fn cookie_name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-]{1,12}".prop_map(|s| s)
}

/// Cookie 値 (cookie-octet の一部)
pub fn cookie_value() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_.-]{0,16}".prop_map(|s| s)
}
