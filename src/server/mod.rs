//! ミドルウェアディスパッチャー
//!
//! 登録順に並んだミドルウェアを右畳み込みで入れ子にして実行する。
//! 最後に追加したミドルウェアが最も外側になり、最初に前処理、最後に後処理を行う。
//! `prepend_middleware` で先頭に入れたものは最も内側になる。
//!
//! ```rust
//! use http11_toolkit::server::{self, NotModified, Propagation, ServerRequest};
//! use http11_toolkit::{HttpMessage, Request, Response, Server};
//!
//! let request = Request::new("GET", "http://example.com/")
//!     .unwrap()
//!     .with_header("If-None-Match", "\"v1\"")
//!     .unwrap();
//! let mut app = Server::new(ServerRequest::new(request));
//! app.append_middleware(server::post(
//!     |_request: &ServerRequest, response: Response, _: &mut Propagation| {
//!         Ok(response.with_header("ETag", "\"v1\"")?.with_body("hello"))
//!     },
//! ));
//! app.append_middleware(NotModified::new());
//!
//! let response = app.handle(Response::default()).unwrap();
//! assert_eq!(response.status_code(), 304);
//! assert!(app.is_propagation_stopped());
//! ```

mod middleware;
mod not_modified;
mod request;

use std::io::Write;

pub use middleware::{FromFn, Middleware, Next, Post, Propagation, from_fn, post};
pub use not_modified::NotModified;
pub use request::{ParsedBody, QueryValue, ServerParams, ServerRequest, UploadedFile, parse_query};

use crate::error::Result;
use crate::response::Response;

/// ミドルウェアディスパッチャー
pub struct Server {
    request: ServerRequest,
    middlewares: Vec<Box<dyn Middleware>>,
    propagation_stopped: bool,
}

impl Server {
    /// リクエストを受け取るサーバーを作成
    pub fn new(request: ServerRequest) -> Self {
        Self {
            request,
            middlewares: Vec::new(),
            propagation_stopped: false,
        }
    }

    /// プロセス環境変数からリクエストを組み立てて作成
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(ServerRequest::from_env()?))
    }

    /// 末尾 (最も外側) にミドルウェアを追加
    pub fn append_middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.middlewares.push(Box::new(middleware));
        self
    }

    /// 先頭 (最も内側) にミドルウェアを追加
    pub fn prepend_middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.middlewares.insert(0, Box::new(middleware));
        self
    }

    /// 登録済みミドルウェアの数
    pub fn middleware_count(&self) -> usize {
        self.middlewares.len()
    }

    /// チェーンを実行する
    ///
    /// 最も内側の層は `initial` の複製を受け取る。
    pub fn handle(&mut self, initial: Response) -> Result<Response> {
        let mut propagation = Propagation::new();
        tracing::debug!(
            middlewares = self.middlewares.len(),
            method = %self.request.method(),
            "dispatching request"
        );
        let result = Next::new(&self.middlewares, &initial).run(&self.request, &mut propagation);
        self.propagation_stopped = propagation.is_stopped();
        if self.propagation_stopped {
            tracing::debug!("propagation stopped");
        }
        result
    }

    /// 直前の `handle` で伝播が止められたかどうか
    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    /// 受け取ったリクエスト
    pub fn request(&self) -> &ServerRequest {
        &self.request
    }
}

/// 最終レスポンスを出力先に書き出す
///
/// ステータス行、ヘッダー (`Set-Cookie` は 1 値 1 行)、空行、ボディの順。
pub fn emit<W: Write>(response: &Response, sink: &mut W) -> Result<()> {
    response.write_to(sink)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::HttpMessage;
    use crate::request::Request;

    fn append_body(text: &'static str) -> impl Middleware {
        post(move |_request: &ServerRequest, response: Response, _: &mut Propagation| {
            let body = format!("{}{}", response.body().to_string_lossy(), text);
            Ok(response.with_body(body))
        })
    }

    fn server() -> Server {
        Server::new(ServerRequest::new(Request::default()))
    }

    #[test]
    fn test_empty_chain_returns_initial() {
        let mut server = server();
        let initial = Response::new(202).unwrap().with_body("queued");
        assert_eq!(server.handle(initial.clone()).unwrap(), initial);
        assert!(!server.is_propagation_stopped());
    }

    #[test]
    fn test_append_order() {
        let mut server = server();
        server
            .append_middleware(append_body("first "))
            .append_middleware(append_body("second"));
        let response = server.handle(Response::default()).unwrap();
        assert_eq!(response.body().to_string_lossy(), "first second");
        assert_eq!(server.middleware_count(), 2);
    }

    #[test]
    fn test_prepend_is_innermost() {
        let mut server = server();
        server.append_middleware(append_body("test content"));
        server.prepend_middleware(append_body("before "));
        let response = server.handle(Response::default()).unwrap();
        assert_eq!(response.body().to_string_lossy(), "before test content");
    }

    #[test]
    fn test_outermost_runs_first() {
        let mut server = server();
        server.append_middleware(from_fn(
            |request: &ServerRequest, next: Next<'_>, propagation: &mut Propagation| {
                let seen = request.attribute::<bool>("seen_by_outer").copied();
                let response = next.run(request, propagation)?;
                response.with_header("X-Inner", format!("{:?}", seen))
            },
        ));
        server.append_middleware(from_fn(
            |request: &ServerRequest, next: Next<'_>, propagation: &mut Propagation| {
                // 前処理は外側が先
                let request = request.with_attribute("seen_by_outer", true);
                let response = next.run(&request, propagation)?;
                // 後処理は外側が後
                let inner = response.header("X-Inner");
                response.with_header("X-Outer", format!("after {}", inner))
            },
        ));
        let response = server.handle(Response::default()).unwrap();
        assert_eq!(response.header("X-Inner"), "Some(true)");
        assert_eq!(response.header("X-Outer"), "after Some(true)");
    }

    #[test]
    fn test_propagation_stopped() {
        let mut server = server();
        server.append_middleware(post(
            |_request: &ServerRequest, response: Response, propagation: &mut Propagation| {
                propagation.stop();
                Ok(response.with_body("test content"))
            },
        ));
        server.append_middleware(append_body("never happens"));
        let response = server.handle(Response::default()).unwrap();
        assert_eq!(response.body().to_string_lossy(), "test content");
        assert!(server.is_propagation_stopped());

        // 伝播フラグは handle ごとに作り直される
        let mut other = Server::new(server.request().clone());
        other.append_middleware(append_body("x"));
        other.handle(Response::default()).unwrap();
        assert!(!other.is_propagation_stopped());
    }

    #[test]
    fn test_error_propagates() {
        let mut server = server();
        server.append_middleware(post(
            |_request: &ServerRequest, response: Response, _: &mut Propagation| {
                response.with_status(999, "")
            },
        ));
        server.append_middleware(append_body("unreachable"));
        assert!(server.handle(Response::default()).is_err());
    }

    #[test]
    fn test_emit() {
        let response = Response::new(404)
            .unwrap()
            .with_header("Content-Type", "text/plain")
            .unwrap()
            .with_added_header("Set-Cookie", ["a=1", "b=2"])
            .unwrap()
            .with_body("nope");
        let mut out = Vec::new();
        emit(&response, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\nSet-Cookie: a=1\r\nSet-Cookie: b=2\r\n\r\nnope"
        );
    }
}
