//! Cookie ヘッダーパース (RFC 6265)
//!
//! ## 概要
//!
//! リクエストの `Cookie` ヘッダーとレスポンスの `Set-Cookie` ヘッダーを扱います。
//! 実際のサーバーが送る値に合わせて、パースは緩めにしています。
//!
//! ## 使い方
//!
//! ```rust
//! use http11_toolkit::cookie::{Cookie, SetCookie};
//!
//! // Cookie ヘッダーパース (パーセントデコードされる)
//! let cookies = Cookie::parse("session=abc%20123; user=john");
//! assert_eq!(cookies[0].name(), "session");
//! assert_eq!(cookies[0].value(), "abc 123");
//!
//! // Set-Cookie ヘッダーパース
//! let set_cookie = SetCookie::parse("session=abc123; Path=/; HttpOnly; Secure").unwrap();
//! assert_eq!(set_cookie.name(), "session");
//! assert_eq!(set_cookie.path(), Some("/"));
//! assert!(set_cookie.http_only());
//! assert!(set_cookie.secure());
//! ```

use core::fmt;

use crate::date::HttpDate;
use crate::uri::{form_decode, percent_encode};

/// Cookie パースエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieError {
    /// 空の Cookie
    Empty,
    /// `name=value` の形式ではない
    InvalidFormat,
    /// 不正な名前
    InvalidName,
    /// 不正な値
    InvalidValue,
    /// 不正な Expires
    InvalidExpires,
    /// 不正な Max-Age
    InvalidMaxAge,
}

impl fmt::Display for CookieError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CookieError::Empty => write!(f, "empty cookie"),
            CookieError::InvalidFormat => write!(f, "invalid cookie format"),
            CookieError::InvalidName => write!(f, "invalid cookie name"),
            CookieError::InvalidValue => write!(f, "invalid cookie value"),
            CookieError::InvalidExpires => write!(f, "invalid Expires attribute"),
            CookieError::InvalidMaxAge => write!(f, "invalid Max-Age attribute"),
        }
    }
}

impl std::error::Error for CookieError {}

/// Cookie (name=value ペア)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
}

impl Cookie {
    /// Cookie を作成 (値はそのまま保持する)
    pub fn new(name: &str, value: &str) -> Self {
        Cookie {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    /// Cookie ヘッダー文字列をパース
    ///
    /// セミコロン区切りの `name=value` を順に返す。名前と値はフォーム形式で
    /// デコードされ、`=` のないペアは空の値になる。名前が空のペアは無視する。
    ///
    /// ```rust
    /// use http11_toolkit::cookie::Cookie;
    ///
    /// let cookies = Cookie::parse("a=1; b; =skipped; c=x%3Dy");
    /// let pairs: Vec<(&str, &str)> = cookies.iter().map(|c| (c.name(), c.value())).collect();
    /// assert_eq!(pairs, [("a", "1"), ("b", ""), ("c", "x=y")]);
    /// ```
    pub fn parse(input: &str) -> Vec<Cookie> {
        input
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
                let name = form_decode(name.trim());
                if name.is_empty() {
                    return None;
                }
                Some(Cookie {
                    name,
                    value: form_decode(unquote(value.trim())),
                })
            })
            .collect()
    }

    /// Cookie 名を取得
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cookie 値を取得
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Cookie のリストを `Cookie` ヘッダー値に変換 (`k1=v1; k2=v2`)
pub fn format_cookie_header(cookies: &[Cookie]) -> String {
    cookies
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// SameSite 属性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    /// Strict: 同一サイトリクエストのみ送信
    Strict,
    /// Lax: トップレベルナビゲーションでは送信
    #[default]
    Lax,
    /// None: すべてのリクエストで送信 (Secure 必須)
    None,
}

impl SameSite {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Some(SameSite::Strict),
            "lax" => Some(SameSite::Lax),
            "none" => Some(SameSite::None),
            _ => None,
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Strict => write!(f, "Strict"),
            SameSite::Lax => write!(f, "Lax"),
            SameSite::None => write!(f, "None"),
        }
    }
}

/// Set-Cookie ヘッダー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    name: String,
    value: String,
    expires: Option<HttpDate>,
    max_age: Option<i64>,
    domain: Option<String>,
    path: Option<String>,
    secure: bool,
    http_only: bool,
    same_site: Option<SameSite>,
}

impl SetCookie {
    /// Set-Cookie ヘッダー文字列をパース
    ///
    /// 名前と値は生のまま保持する。未知の属性と不正な SameSite は無視する。
    /// Expires は `GMT` / `UTC` のどちらの表記も受け付ける。
    ///
    /// ```rust
    /// use http11_toolkit::cookie::SetCookie;
    ///
    /// let cookie = SetCookie::parse("id=1; Expires=Sun, 06-Nov-1994 08:49:37 UTC").unwrap();
    /// assert_eq!(cookie.expires().map(|d| d.year()), Some(1994));
    /// ```
    pub fn parse(input: &str) -> Result<Self, CookieError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CookieError::Empty);
        }

        let mut parts = input.split(';');

        // 最初の部分は name=value
        let first = parts.next().ok_or(CookieError::InvalidFormat)?;
        let (name, value) = first.split_once('=').ok_or(CookieError::InvalidFormat)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(CookieError::InvalidName);
        }

        let mut set_cookie = SetCookie::unchecked(name, value.trim());

        for part in parts {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            if let Some((attr_name, attr_value)) = part.split_once('=') {
                let attr_value = attr_value.trim();
                match attr_name.trim().to_ascii_lowercase().as_str() {
                    "expires" => {
                        set_cookie.expires = Some(
                            HttpDate::parse_lenient(attr_value)
                                .map_err(|_| CookieError::InvalidExpires)?,
                        );
                    }
                    "max-age" => {
                        set_cookie.max_age = Some(
                            attr_value
                                .parse::<i64>()
                                .map_err(|_| CookieError::InvalidMaxAge)?,
                        );
                    }
                    "domain" => set_cookie.domain = Some(attr_value.to_string()),
                    "path" => set_cookie.path = Some(attr_value.to_string()),
                    "samesite" => set_cookie.same_site = SameSite::parse(attr_value),
                    _ => {}
                }
            } else {
                match part.to_ascii_lowercase().as_str() {
                    "secure" => set_cookie.secure = true,
                    "httponly" => set_cookie.http_only = true,
                    _ => {}
                }
            }
        }

        Ok(set_cookie)
    }

    /// 新しい SetCookie を作成
    ///
    /// 名前はトークン、値は cookie-octet のみ許可する。
    pub fn new(name: &str, value: &str) -> Result<Self, CookieError> {
        if !is_valid_cookie_name(name) {
            return Err(CookieError::InvalidName);
        }
        if !is_valid_cookie_value(value) {
            return Err(CookieError::InvalidValue);
        }
        Ok(SetCookie::unchecked(name, value))
    }

    /// 名前と値をパーセントエンコードして作成
    ///
    /// 任意の文字列を名前と値に使える。
    ///
    /// ```rust
    /// use http11_toolkit::cookie::SetCookie;
    ///
    /// let cookie = SetCookie::encoded("user name", "a;b");
    /// assert_eq!(cookie.to_string(), "user%20name=a%3Bb");
    /// ```
    pub fn encoded(name: &str, value: &str) -> Self {
        SetCookie::unchecked(&percent_encode(name), &percent_encode(value))
    }

    fn unchecked(name: &str, value: &str) -> Self {
        SetCookie {
            name: name.to_string(),
            value: value.to_string(),
            expires: None,
            max_age: None,
            domain: None,
            path: None,
            secure: false,
            http_only: false,
            same_site: None,
        }
    }

    /// Cookie 名を取得
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cookie 値を取得
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Expires 属性を取得
    pub fn expires(&self) -> Option<&HttpDate> {
        self.expires.as_ref()
    }

    /// Max-Age 属性を取得 (秒)
    pub fn max_age(&self) -> Option<i64> {
        self.max_age
    }

    /// Domain 属性を取得
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// Path 属性を取得
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Secure 属性を取得
    pub fn secure(&self) -> bool {
        self.secure
    }

    /// HttpOnly 属性を取得
    pub fn http_only(&self) -> bool {
        self.http_only
    }

    /// SameSite 属性を取得
    pub fn same_site(&self) -> Option<SameSite> {
        self.same_site
    }

    /// Expires が指定時刻 (Unix 時刻) より前かどうか
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires
            .as_ref()
            .is_some_and(|expires| expires.to_unix_time() < now)
    }

    /// Expires を設定
    pub fn with_expires(mut self, expires: HttpDate) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Max-Age を設定
    pub fn with_max_age(mut self, max_age: i64) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Domain を設定
    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domain = Some(domain.to_string());
        self
    }

    /// Path を設定
    pub fn with_path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    /// Secure を設定
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// HttpOnly を設定
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// SameSite を設定
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }
}

impl fmt::Display for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;

        if let Some(domain) = &self.domain {
            write!(f, "; Domain={}", domain)?;
        }
        if let Some(path) = &self.path {
            write!(f, "; Path={}", path)?;
        }
        if let Some(expires) = &self.expires {
            write!(f, "; Expires={}", expires)?;
        }
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={}", max_age)?;
        }
        if self.secure {
            write!(f, "; Secure")?;
        }
        if self.http_only {
            write!(f, "; HttpOnly")?;
        }
        if let Some(same_site) = self.same_site {
            write!(f, "; SameSite={}", same_site)?;
        }

        Ok(())
    }
}

/// Set-Cookie ヘッダー値から Cookie 名を取り出す (`=` より前)
pub(crate) fn set_cookie_name(line: &str) -> &str {
    line.split_once('=').map_or(line, |(name, _)| name).trim()
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// 有効な Cookie 名かどうか
/// RFC 6265 Section 4.1.1: cookie-name = token
fn is_valid_cookie_name(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(is_token_char)
}

/// 有効な Cookie 値かどうか
/// RFC 6265 Section 4.1.1
fn is_valid_cookie_value(s: &str) -> bool {
    s.bytes().all(is_cookie_octet)
}

/// トークン文字 (RFC 9110)
fn is_token_char(b: u8) -> bool {
    matches!(b,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' |
        b'0'..=b'9' | b'A'..=b'Z' | b'^' | b'_' | b'`' | b'a'..=b'z' | b'|' | b'~'
    )
}

/// Cookie 値に使える文字
fn is_cookie_octet(b: u8) -> bool {
    b == 0x21
        || (0x23..=0x2B).contains(&b)
        || (0x2D..=0x3A).contains(&b)
        || (0x3C..=0x5B).contains(&b)
        || (0x5D..=0x7E).contains(&b)
}
