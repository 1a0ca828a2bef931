//! 条件付き GET / HEAD の 304 応答 (RFC 9110 Section 13.1.2, 13.1.3)

use crate::body::Body;
use crate::date::HttpDate;
use crate::error::Result;
use crate::headers::HttpMessage;
use crate::request::Method;
use crate::response::Response;
use crate::server::middleware::{Middleware, Next, Propagation};
use crate::server::request::ServerRequest;

/// 304 では送らないエンティティヘッダー
const ENTITY_HEADERS: [&str; 7] = [
    "allow",
    "content-encoding",
    "content-language",
    "content-length",
    "content-md5",
    "content-type",
    "last-modified",
];

/// 変更がなければ 304 Not Modified に置き換えるミドルウェア
///
/// 内側の層が作ったレスポンスの `ETag` / `Last-Modified` を
/// リクエストの `If-None-Match` / `If-Modified-Since` と比べる。
/// 304 にした場合は伝播を止める。
#[derive(Debug, Default, Clone, Copy)]
pub struct NotModified;

impl NotModified {
    pub fn new() -> Self {
        Self
    }

    /// 変更されていないかどうか
    ///
    /// If-None-Match があれば ETag (弱い比較、`*` はすべてに一致) で判定し、
    /// If-Modified-Since も送られていれば Last-Modified も一致する必要がある。
    /// If-None-Match がなければ If-Modified-Since だけで判定する。
    pub fn is_not_modified(request: &ServerRequest, response: &Response) -> bool {
        if !matches!(request.method(), Method::Get | Method::Head) {
            return false;
        }

        let since = request.header("If-Modified-Since");
        let last_modified = response.header("Last-Modified");
        let if_none_match = request.header("If-None-Match");
        let candidates: Vec<&str> = if_none_match
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();

        if !candidates.is_empty() {
            let etag = response.header("ETag");
            let etag_matches = candidates
                .iter()
                .any(|c| *c == "*" || (!etag.is_empty() && weak_eq(c, &etag)));
            etag_matches && (since.is_empty() || unmodified_since(&since, &last_modified))
        } else if !since.is_empty() {
            unmodified_since(&since, &last_modified)
        } else {
            false
        }
    }
}

impl Middleware for NotModified {
    fn handle(
        &self,
        request: &ServerRequest,
        next: Next<'_>,
        propagation: &mut Propagation,
    ) -> Result<Response> {
        let response = next.run(request, propagation)?;
        if propagation.is_stopped() || !Self::is_not_modified(request, &response) {
            return Ok(response);
        }

        tracing::debug!(
            request_target = %request.request().request_target(),
            "responding 304 not modified"
        );
        let mut response = response.with_status(304, "")?.with_body(Body::new());
        for name in ENTITY_HEADERS {
            response = response.without_header(name);
        }
        propagation.stop();
        Ok(response)
    }
}

/// 弱い比較 (`W/` を無視して opaque-tag を比べる)
fn weak_eq(a: &str, b: &str) -> bool {
    let strip = |t: &str| t.trim().strip_prefix("W/").unwrap_or(t.trim()).to_string();
    strip(a) == strip(b)
}

/// Last-Modified が If-Modified-Since 以前かどうか
///
/// どちらかが日時として解釈できなければ文字列の一致で判定する。
fn unmodified_since(since: &str, last_modified: &str) -> bool {
    match (
        HttpDate::parse_lenient(since),
        HttpDate::parse_lenient(last_modified),
    ) {
        (Ok(since), Ok(last_modified)) => last_modified.to_unix_time() <= since.to_unix_time(),
        _ => !last_modified.is_empty() && since.trim() == last_modified.trim(),
    }
}
