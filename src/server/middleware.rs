//! ミドルウェアと呼び出しチェーン

use crate::error::Result;
use crate::response::Response;
use crate::server::request::ServerRequest;

/// 伝播停止フラグ
///
/// チェーン全体で 1 つだけ作られ、すべての層に `&mut` で渡される。
/// 一度止めると元に戻せない。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Propagation {
    stopped: bool,
}

impl Propagation {
    /// 停止していない状態で作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 外側のミドルウェアの後処理を止める
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// 停止済みかどうか
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

/// ミドルウェア
///
/// `next` を呼ぶと内側の層が実行され、そのレスポンスが返る。
/// `next` を呼ばずにレスポンスを返せば内側の層は実行されない。
pub trait Middleware {
    fn handle(
        &self,
        request: &ServerRequest,
        next: Next<'_>,
        propagation: &mut Propagation,
    ) -> Result<Response>;
}

impl<M: Middleware + ?Sized> Middleware for Box<M> {
    fn handle(
        &self,
        request: &ServerRequest,
        next: Next<'_>,
        propagation: &mut Propagation,
    ) -> Result<Response> {
        (**self).handle(request, next, propagation)
    }
}

/// 内側の層の呼び出し
///
/// 末尾が外側。リストが尽きたら初期レスポンスの複製を返す。
pub struct Next<'a> {
    inner: &'a [Box<dyn Middleware>],
    initial: &'a Response,
}

impl<'a> Next<'a> {
    pub(crate) fn new(inner: &'a [Box<dyn Middleware>], initial: &'a Response) -> Self {
        Self { inner, initial }
    }

    /// 残りの層を実行する
    pub fn run(self, request: &ServerRequest, propagation: &mut Propagation) -> Result<Response> {
        match self.inner.split_last() {
            Some((outer, rest)) => {
                outer.handle(request, Next::new(rest, self.initial), propagation)
            }
            None => Ok(self.initial.clone()),
        }
    }

    /// 残りの層の数
    pub fn remaining(&self) -> usize {
        self.inner.len()
    }
}

/// 関数からミドルウェアを作る
///
/// ```rust
/// use http11_toolkit::server::{self, Next, Propagation, ServerRequest};
/// use http11_toolkit::{HttpMessage, Request, Response, Server};
///
/// let mut app = Server::new(ServerRequest::new(Request::default()));
/// app.append_middleware(server::from_fn(
///     |request: &ServerRequest, next: Next<'_>, propagation: &mut Propagation| {
///         let response = next.run(request, propagation)?;
///         response.with_header("X-Handled", "1")
///     },
/// ));
/// let response = app.handle(Response::default()).unwrap();
/// assert_eq!(response.header("X-Handled"), "1");
/// ```
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: Fn(&ServerRequest, Next<'_>, &mut Propagation) -> Result<Response>,
{
    FromFn(f)
}

/// [`from_fn`] で作られるミドルウェア
pub struct FromFn<F>(F);

impl<F> Middleware for FromFn<F>
where
    F: Fn(&ServerRequest, Next<'_>, &mut Propagation) -> Result<Response>,
{
    fn handle(
        &self,
        request: &ServerRequest,
        next: Next<'_>,
        propagation: &mut Propagation,
    ) -> Result<Response> {
        (self.0)(request, next, propagation)
    }
}

/// 後処理だけを行うミドルウェアを作る
///
/// 先に内側の層を実行し、伝播が止まっていなければ `f` でレスポンスを加工する。
pub fn post<F>(f: F) -> Post<F>
where
    F: Fn(&ServerRequest, Response, &mut Propagation) -> Result<Response>,
{
    Post(f)
}

/// [`post`] で作られるミドルウェア
pub struct Post<F>(F);

impl<F> Middleware for Post<F>
where
    F: Fn(&ServerRequest, Response, &mut Propagation) -> Result<Response>,
{
    fn handle(
        &self,
        request: &ServerRequest,
        next: Next<'_>,
        propagation: &mut Propagation,
    ) -> Result<Response> {
        let response = next.run(request, propagation)?;
        if propagation.is_stopped() {
            return Ok(response);
        }
        (self.0)(request, response, propagation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::HttpMessage;
    use crate::request::Request;

    fn tag(name: &'static str) -> Box<dyn Middleware> {
        Box::new(post(move |_request: &ServerRequest, response: Response, _: &mut Propagation| {
            let body = format!("{}{}", response.body().to_string_lossy(), name);
            Ok(response.with_body(body))
        }))
    }

    #[test]
    fn test_next_runs_inner_layers() {
        let layers = vec![tag("a"), tag("b"), tag("c")];
        let initial = Response::default();
        let request = ServerRequest::new(Request::default());
        let mut propagation = Propagation::new();
        let response = Next::new(&layers, &initial)
            .run(&request, &mut propagation)
            .unwrap();
        // 先頭が最も内側
        assert_eq!(response.body().to_string_lossy(), "abc");
    }

    #[test]
    fn test_exhausted_next_returns_initial() {
        let initial = Response::new(201).unwrap().with_body("seed");
        let request = ServerRequest::new(Request::default());
        let mut propagation = Propagation::new();
        let next = Next::new(&[], &initial);
        assert_eq!(next.remaining(), 0);
        assert_eq!(next.run(&request, &mut propagation).unwrap(), initial);
    }

    #[test]
    fn test_post_skipped_after_stop() {
        let stopper: Box<dyn Middleware> = Box::new(post(
            |_request: &ServerRequest, response: Response, propagation: &mut Propagation| {
                propagation.stop();
                Ok(response.with_body("stopped"))
            },
        ));
        let layers = vec![stopper, tag("never")];
        let initial = Response::default();
        let request = ServerRequest::new(Request::default());
        let mut propagation = Propagation::new();
        let response = Next::new(&layers, &initial)
            .run(&request, &mut propagation)
            .unwrap();
        assert_eq!(response.body().to_string_lossy(), "stopped");
        assert!(propagation.is_stopped());
    }

    #[test]
    fn test_short_circuit() {
        let layers: Vec<Box<dyn Middleware>> = vec![tag("inner")];
        let initial = Response::default();
        let request = ServerRequest::new(Request::default());
        let mut propagation = Propagation::new();
        let guard = from_fn(|_request: &ServerRequest, _next: Next<'_>, _: &mut Propagation| {
            Response::new(403)
        });
        let response = guard
            .handle(&request, Next::new(&layers, &initial), &mut propagation)
            .unwrap();
        assert!(response.is_forbidden());
        // 内側の層は実行されない
        assert!(response.body().is_empty());
    }
}
