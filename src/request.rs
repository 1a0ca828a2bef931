use core::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::headers::{HttpMessage, MessageBase};
use crate::uri::Uri;

/// HTTP メソッド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    Connect,
    Delete,
    #[default]
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
}

impl Method {
    /// メソッド名 (大文字)
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Connect => "CONNECT",
            Method::Delete => "DELETE",
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Trace => "TRACE",
        }
    }
}

impl FromStr for Method {
    type Err = Error;

    /// 大文字小文字を区別せずにパース
    fn from_str(s: &str) -> Result<Self> {
        const ALL: [Method; 9] = [
            Method::Connect,
            Method::Delete,
            Method::Get,
            Method::Head,
            Method::Options,
            Method::Patch,
            Method::Post,
            Method::Put,
            Method::Trace,
        ];
        ALL.into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidMethod(s.to_string()))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP リクエスト
///
/// 不変の値として扱い、変更操作は新しいリクエストを返す。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Request {
    base: MessageBase,
    method: Method,
    uri: Option<Uri>,
    request_target: Option<String>,
}

impl Request {
    /// メソッド名と URI 文字列からリクエストを作成
    ///
    /// URI にホストがあれば `Host` ヘッダーを付与する。
    ///
    /// ```rust
    /// use http11_toolkit::{HttpMessage, Request};
    ///
    /// let request = Request::new("get", "http://example.com:8080/path").unwrap();
    /// assert_eq!(request.method().as_str(), "GET");
    /// assert_eq!(request.header("Host"), "example.com:8080");
    /// ```
    pub fn new(method: &str, uri: &str) -> Result<Self> {
        let method = method.parse()?;
        let uri = Uri::parse(uri)?;
        Ok(Self::from_parts(method, Some(uri)))
    }

    /// メソッドと URI からリクエストを作成
    pub fn from_parts(method: Method, uri: Option<Uri>) -> Self {
        let mut request = Request {
            method,
            ..Default::default()
        };
        if let Some(uri) = uri {
            request.set_uri(uri);
        }
        request
    }

    fn set_uri(&mut self, uri: Uri) {
        if let Some(host) = host_header_value(&uri) {
            self.base.headers.set("host", vec![host]);
        }
        self.uri = Some(uri);
        self.request_target = None;
    }

    /// メソッドを取得
    pub fn method(&self) -> Method {
        self.method
    }

    /// メソッドを変更 (大文字小文字を区別しない)
    pub fn with_method(&self, method: &str) -> Result<Self> {
        let method = method.parse()?;
        Ok(Request {
            method,
            ..self.clone()
        })
    }

    /// URI を取得
    pub fn uri(&self) -> Option<&Uri> {
        self.uri.as_ref()
    }

    /// URI を変更
    ///
    /// 新しい URI にホストがあれば `Host` ヘッダーも置き換える。
    /// 明示的に設定された request-target は解除される。
    pub fn with_uri(&self, uri: Uri) -> Self {
        let mut request = self.clone();
        request.set_uri(uri);
        request
    }

    /// request-target を取得
    ///
    /// 明示的に設定されていなければ URI の origin-form (path + query)。
    /// URI がなければ `/`。
    pub fn request_target(&self) -> String {
        match (&self.request_target, &self.uri) {
            (Some(target), _) => target.clone(),
            (None, Some(uri)) => uri.origin_form(),
            (None, None) => "/".to_string(),
        }
    }

    /// request-target を明示的に設定 (例: `*`、absolute-form)
    pub fn with_request_target(&self, target: &str) -> Result<Self> {
        if target.is_empty()
            || target
                .bytes()
                .any(|b| b.is_ascii_whitespace() || b.is_ascii_control())
        {
            return Err(Error::InvalidHeader(format!(
                "invalid request target: {:?}",
                target
            )));
        }
        Ok(Request {
            request_target: Some(target.to_string()),
            ..self.clone()
        })
    }
}

impl HttpMessage for Request {
    fn base(&self) -> &MessageBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut MessageBase {
        &mut self.base
    }
}

/// URI から Host ヘッダー値を作る (既定以外のポートを含む)
fn host_header_value(uri: &Uri) -> Option<String> {
    if uri.host().is_empty() {
        return None;
    }
    Some(match uri.port() {
        Some(port) => format!("{}:{}", uri.host(), port),
        None => uri.host().to_string(),
    })
}
