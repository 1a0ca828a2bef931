use crate::cookie::{SetCookie, set_cookie_name};
use crate::date::HttpDate;
use crate::error::{Error, Result};
use crate::headers::{HttpMessage, MessageBase};

/// ステータスコードに対応する既定の理由句
///
/// テーブルにないコードは `None`。
pub fn reason_phrase(status_code: u16) -> Option<&'static str> {
    let phrase = match status_code {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        307 => "Temporary Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Request Entity Too Large",
        414 => "Request-URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Requested Range Not Satisfiable",
        417 => "Expectation Failed",
        418 => "I'm a teapot",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        _ => return None,
    };
    Some(phrase)
}

/// HTTP レスポンス
///
/// 不変の値として扱い、変更操作は新しいレスポンスを返す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    base: MessageBase,
    status_code: u16,
    reason_phrase: String,
}

impl Default for Response {
    fn default() -> Self {
        Response {
            base: MessageBase::default(),
            status_code: 200,
            reason_phrase: "OK".to_string(),
        }
    }
}

impl Response {
    /// ステータスコードからレスポンスを作成
    ///
    /// ```rust
    /// use http11_toolkit::Response;
    ///
    /// let response = Response::new(404).unwrap();
    /// assert_eq!(response.reason_phrase(), "Not Found");
    /// assert!(Response::new(909).is_err());
    /// ```
    pub fn new(status_code: u16) -> Result<Self> {
        Response::default().with_status(status_code, "")
    }

    /// ステータスコードを取得
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// 理由句を取得
    pub fn reason_phrase(&self) -> &str {
        &self.reason_phrase
    }

    /// ステータスを変更
    ///
    /// `reason` が空ならテーブルの理由句を使う。
    pub fn with_status(&self, status_code: u16, reason: &str) -> Result<Self> {
        let default = reason_phrase(status_code).ok_or(Error::InvalidStatusCode(status_code))?;
        let reason = if reason.is_empty() { default } else { reason };
        if reason.bytes().any(|b| b == b'\r' || b == b'\n') {
            return Err(Error::InvalidHeader(format!(
                "invalid reason phrase: {:?}",
                reason
            )));
        }
        Ok(Response {
            status_code,
            reason_phrase: reason.to_string(),
            ..self.clone()
        })
    }

    /// `Set-Cookie` を追加
    pub fn with_cookie(&self, cookie: &SetCookie) -> Result<Self> {
        self.with_added_header("Set-Cookie", cookie.to_string())
    }

    /// ブラウザーに Cookie の削除を指示する `Set-Cookie` を追加
    ///
    /// 空の値と 1 日前の Expires を送る。
    pub fn with_removed_cookie(&self, cookie: &SetCookie) -> Result<Self> {
        let yesterday = HttpDate::from_unix_time(HttpDate::now().to_unix_time() - 86_400);
        let mut removal = SetCookie::encoded(cookie.name(), "").with_expires(yesterday);
        if let Some(domain) = cookie.domain() {
            removal = removal.with_domain(domain);
        }
        if let Some(path) = cookie.path() {
            removal = removal.with_path(path);
        }
        let removal = removal
            .with_secure(cookie.secure())
            .with_http_only(cookie.http_only());
        self.with_cookie(&removal)
    }

    /// 指定した名前の `Set-Cookie` 行をすべて取り除く
    pub fn without_cookie(&self, name: &str) -> Self {
        if !self.has_cookie(name) {
            return self.clone();
        }
        let remaining: Vec<String> = self
            .header_lines("Set-Cookie")
            .iter()
            .filter(|line| set_cookie_name(line) != name)
            .cloned()
            .collect();
        let mut response = self.clone();
        if remaining.is_empty() {
            response.base.headers.remove("set-cookie");
        } else {
            response.base.headers.set("set-cookie", remaining);
        }
        response
    }

    /// 指定した名前の `Set-Cookie` があるかどうか
    pub fn has_cookie(&self, name: &str) -> bool {
        self.header_lines("Set-Cookie")
            .iter()
            .any(|line| set_cookie_name(line) == name)
    }

    /// 1xx
    pub fn is_informational(&self) -> bool {
        (100..200).contains(&self.status_code)
    }

    /// 200
    pub fn is_ok(&self) -> bool {
        self.status_code == 200
    }

    /// 2xx
    pub fn is_successful(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// リダイレクトとして追従するステータス (301, 302, 303, 307)
    pub fn is_redirect(&self) -> bool {
        matches!(self.status_code, 301 | 302 | 303 | 307)
    }

    /// 3xx
    pub fn is_redirection(&self) -> bool {
        (300..400).contains(&self.status_code)
    }

    /// 403
    pub fn is_forbidden(&self) -> bool {
        self.status_code == 403
    }

    /// 404
    pub fn is_not_found(&self) -> bool {
        self.status_code == 404
    }

    /// 4xx
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code)
    }

    /// 5xx
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status_code)
    }
}

impl HttpMessage for Response {
    fn base(&self) -> &MessageBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut MessageBase {
        &mut self.base
    }
}
