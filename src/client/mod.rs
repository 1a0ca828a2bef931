//! HTTP クライアント
//!
//! 1 回の送受信を行う [`Transport`] の上で、リダイレクト追従と
//! Cookie の引き継ぎを行う。
//!
//! ## 使い方
//!
//! ```no_run
//! use http11_toolkit::{Client, ClientOptions, HttpMessage, Request};
//!
//! let mut client = Client::with_options(ClientOptions::new().max_redirections(3));
//! let request = Request::new("GET", "https://example.com/").unwrap();
//! let response = client.send(request).unwrap();
//! println!("{} {}", response.status_code(), response.body().to_string_lossy());
//! ```

mod options;
mod socket;

use std::time::Instant;

pub use options::ClientOptions;
pub use socket::SocketTransport;

use crate::cookie::{Cookie, SetCookie, format_cookie_header};
use crate::date::HttpDate;
use crate::error::{Error, Result};
use crate::headers::HttpMessage;
use crate::request::Request;
use crate::response::Response;
use crate::uri;

/// 1 回分のリクエスト送信とレスポンス受信
///
/// リダイレクトや Cookie の扱いは [`Client`] が行う。
pub trait Transport {
    /// リクエストを送信してレスポンスを受け取る
    fn send(&mut self, request: &Request, options: &ClientOptions) -> Result<Response>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, request: &Request, options: &ClientOptions) -> Result<Response> {
        (**self).send(request, options)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, request: &Request, options: &ClientOptions) -> Result<Response> {
        (**self).send(request, options)
    }
}

/// HTTP クライアント
pub struct Client<T = SocketTransport> {
    transport: T,
    options: ClientOptions,
    redirections: usize,
    started: Option<Instant>,
    last_request: Option<Request>,
}

impl Default for Client<SocketTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl Client<SocketTransport> {
    /// ソケットトランスポートを使うクライアントを作成
    pub fn new() -> Self {
        Self::with_options(ClientOptions::default())
    }

    /// 設定を指定してクライアントを作成
    pub fn with_options(options: ClientOptions) -> Self {
        Self::with_transport(SocketTransport::new(), options)
    }
}

impl<T: Transport> Client<T> {
    /// トランスポートを指定してクライアントを作成
    pub fn with_transport(transport: T, options: ClientOptions) -> Self {
        Self {
            transport,
            options,
            redirections: 0,
            started: None,
            last_request: None,
        }
    }

    /// 設定を取得
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// 設定を変更
    pub fn options_mut(&mut self) -> &mut ClientOptions {
        &mut self.options
    }

    /// トランスポートを取得
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// 直近の送信で追従したリダイレクト回数
    pub fn redirections(&self) -> usize {
        self.redirections
    }

    /// 最後に送信したリクエスト (Cookie 反映後)
    pub fn last_request(&self) -> Option<&Request> {
        self.last_request.as_ref()
    }

    /// リクエストを送信する
    ///
    /// リダイレクト回数とタイマーをリセットしてから送信し、設定に応じて
    /// リダイレクトに追従する。
    pub fn send(&mut self, request: Request) -> Result<Response> {
        self.redirections = 0;
        self.started = Some(Instant::now());
        self.send_in_chain(request)
    }

    fn send_in_chain(&mut self, request: Request) -> Result<Response> {
        let started = *self.started.get_or_insert_with(Instant::now);
        tracing::debug!(
            method = %request.method(),
            request_target = %request.request_target(),
            redirections = self.redirections,
            "sending request"
        );

        let response = self.transport.send(&request, &self.options)?;

        let elapsed = started.elapsed();
        if !self.options.timeout.is_zero() && elapsed > self.options.timeout {
            return Err(Error::Timeout {
                elapsed,
                limit: self.options.timeout,
            });
        }

        let request = if self.options.use_cookies {
            self.set_request_cookies(&request, &response)
        } else {
            request
        };
        self.last_request = Some(request.clone());

        self.follow_redirection(request, response)
    }

    /// リダイレクトに追従する
    ///
    /// 追従しない設定か、ステータスが 301 / 302 / 303 / 307 以外なら
    /// レスポンスをそのまま返す。
    pub fn follow_redirection(&mut self, request: Request, response: Response) -> Result<Response> {
        if !self.options.follow_redirections || !response.is_redirect() {
            return Ok(response);
        }

        if self.redirections >= self.options.max_redirections {
            return Err(Error::RedirectLimitExceeded {
                max: self.options.max_redirections,
            });
        }

        let location = response
            .header_lines("Location")
            .first()
            .filter(|l| !l.is_empty())
            .ok_or(Error::MissingLocation {
                status_code: response.status_code(),
            })?;

        self.redirections += 1;

        let base = request.uri().cloned().unwrap_or_default();
        let target = uri::resolve(&base, location)?;
        tracing::debug!(
            status = response.status_code(),
            location = %target,
            "following redirection"
        );

        self.send_in_chain(request.with_uri(target))
    }

    /// レスポンスの `Set-Cookie` をリクエストの `Cookie` ヘッダーに反映する
    ///
    /// 同じ名前の Cookie は後のものが優先される。次の場合は送らない:
    /// - Expires が過去、または解釈できない
    /// - Domain がホストと一致せず、`.` 始まりのサフィックスでもない
    /// - Path が `/` でもリクエストのパスでもない
    /// - Secure なのに https ではない
    ///
    /// 送る Cookie がなければリクエストをそのまま返す。
    pub fn set_request_cookies(&self, request: &Request, response: &Response) -> Request {
        let lines = response.header_lines("Set-Cookie");
        if lines.is_empty() {
            return request.clone();
        }

        let uri = request.uri().cloned().unwrap_or_default();
        let now = HttpDate::now().to_unix_time();
        let mut jar: Vec<Cookie> = Vec::new();

        for line in lines {
            let pair = line.split(';').next().unwrap_or_default();
            let Some((name, _)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim();
            jar.retain(|c| c.name() != name);

            let set_cookie = match SetCookie::parse(line) {
                Ok(set_cookie) => set_cookie,
                Err(e) => {
                    tracing::warn!(cookie = %line, error = %e, "dropping malformed cookie");
                    continue;
                }
            };

            if set_cookie.is_expired_at(now) {
                tracing::debug!(name, "cookie expired");
                continue;
            }
            if let Some(domain) = set_cookie.domain()
                && !domain_matches(domain, uri.host())
            {
                tracing::debug!(name, domain, host = uri.host(), "cookie domain mismatch");
                continue;
            }
            if let Some(path) = set_cookie.path()
                && path != "/"
                && path != uri.path()
            {
                tracing::debug!(name, path, "cookie path mismatch");
                continue;
            }
            if set_cookie.secure() && uri.scheme() != "https" {
                tracing::debug!(name, "secure cookie over insecure scheme");
                continue;
            }

            jar.push(Cookie::new(set_cookie.name(), set_cookie.value()));
        }

        if jar.is_empty() {
            return request.clone();
        }

        let mut request = request.clone();
        request
            .base_mut()
            .headers
            .set("cookie", vec![format_cookie_header(&jar)]);
        request
    }
}

/// Domain 属性がホストに一致するかどうか
///
/// 完全一致、または `.` 始まりの値がホストのサフィックスになっている場合。
fn domain_matches(domain: &str, host: &str) -> bool {
    domain.eq_ignore_ascii_case(host)
        || (domain.starts_with('.')
            && host.len() > domain.len()
            && host[host.len() - domain.len()..].eq_ignore_ascii_case(domain))
}
