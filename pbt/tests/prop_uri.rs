//! URI のプロパティテスト (uri.rs)

use http11_toolkit::uri::{Uri, percent_decode, percent_encode, resolve};
use pbt::{absolute_path, host, path_segment, query};
use proptest::prelude::*;

// ========================================
// パース
// ========================================

// 構成要素から組み立てた URI は同じ構成要素にパースされる
proptest! {
    #[test]
    fn prop_uri_components(
        https in any::<bool>(),
        host in host(),
        port in prop::option::of(1024u16..=65535),
        path in absolute_path(),
        query in query(),
    ) {
        let scheme = if https { "https" } else { "http" };
        let mut input = format!("{}://{}", scheme, host);
        if let Some(port) = port {
            input.push_str(&format!(":{}", port));
        }
        input.push_str(&path);
        if !query.is_empty() {
            input.push('?');
            input.push_str(&query);
        }

        let uri = Uri::parse(&input).unwrap();
        prop_assert_eq!(uri.scheme(), scheme);
        prop_assert_eq!(uri.host(), host.as_str());
        prop_assert_eq!(uri.port(), port);
        prop_assert_eq!(uri.path(), path.as_str());
        prop_assert_eq!(uri.query(), query.as_str());
        prop_assert_eq!(uri.to_string(), input);
    }
}

// 既定ポートは表示されず、接続先ポートとしては使われる
proptest! {
    #[test]
    fn prop_default_port_hidden(https in any::<bool>(), host in host()) {
        let (scheme, port) = if https { ("https", 443) } else { ("http", 80) };
        let uri = Uri::parse(&format!("{}://{}:{}/", scheme, host, port)).unwrap();
        prop_assert_eq!(uri.port(), None);
        prop_assert_eq!(uri.port_or_default(), port);
        prop_assert_eq!(uri.authority(), host);
    }
}

// 表示してから再パースしても変わらない
proptest! {
    #[test]
    fn prop_display_is_stable(host in host(), path in absolute_path(), fragment in "[a-z]{0,8}") {
        let mut input = format!("http://{}{}", host, path);
        if !fragment.is_empty() {
            input.push('#');
            input.push_str(&fragment);
        }
        let uri = Uri::parse(&input).unwrap();
        let reparsed = Uri::parse(&uri.to_string()).unwrap();
        prop_assert_eq!(reparsed, uri);
    }
}

// ========================================
// 相対参照の解決
// ========================================

// 絶対パスの参照は基底のホストを保ち、パスとクエリを置き換える
proptest! {
    #[test]
    fn prop_resolve_absolute_path(
        host in host(),
        base_path in absolute_path(),
        path in absolute_path(),
        query in query(),
    ) {
        let base = Uri::parse(&format!("https://{}{}?old=1", host, base_path)).unwrap();
        let reference = if query.is_empty() { path.clone() } else { format!("{}?{}", path, query) };
        let resolved = resolve(&base, &reference).unwrap();
        prop_assert_eq!(resolved.scheme(), "https");
        prop_assert_eq!(resolved.host(), host.as_str());
        prop_assert_eq!(resolved.path(), path.as_str());
        prop_assert_eq!(resolved.query(), query.as_str());
    }
}

// 相対パスの参照は基底パスの最後のセグメントを置き換える
proptest! {
    #[test]
    fn prop_resolve_relative_segment(
        host in host(),
        dir in path_segment(),
        file in path_segment(),
        target in path_segment(),
    ) {
        let base = Uri::parse(&format!("http://{}/{}/{}", host, dir, file)).unwrap();
        let resolved = resolve(&base, &target).unwrap();
        let expected = format!("/{}/{}", dir, target);
        prop_assert_eq!(resolved.path(), expected.as_str());
    }
}

// 絶対 URI の参照は基底に関係なくそのまま使われる
proptest! {
    #[test]
    fn prop_resolve_absolute_uri(base_host in host(), host in host(), path in absolute_path()) {
        let base = Uri::parse(&format!("http://{}/a/b", base_host)).unwrap();
        let target = format!("https://{}{}", host, path);
        let resolved = resolve(&base, &target).unwrap();
        prop_assert_eq!(resolved.to_string(), target);
    }
}

// ========================================
// パーセントエンコード
// ========================================

proptest! {
    #[test]
    fn prop_percent_encode_decode_roundtrip(s in "\\PC{0,32}") {
        let encoded = percent_encode(&s);
        prop_assert!(encoded.bytes().all(|b| b.is_ascii_alphanumeric() || b"-._~%".contains(&b)));
        prop_assert_eq!(percent_decode(&encoded).unwrap(), s);
    }
}
