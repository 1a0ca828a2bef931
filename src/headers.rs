//! ヘッダーとメッセージ共通部分
//!
//! ヘッダー名は小文字に正規化して保持し、値は名前ごとに順序付きの列として持つ。
//! 名前の挿入順は保持される。

use crate::body::Body;
use crate::error::{Error, Result};

/// ヘッダー名がトークン文字のみで構成されているか (RFC 9110 Section 5.1)
fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'*'
                | b'+'
                | b'-'
                | b'.'
                | b'^'
                | b'_'
                | b'`'
                | b'|'
                | b'~'
        )
}

/// ヘッダー名を検証
pub fn validate_header_name(name: &str) -> Result<()> {
    if name.is_empty() || !name.bytes().all(is_token_char) {
        return Err(Error::InvalidHeader(format!("invalid header name: {:?}", name)));
    }
    Ok(())
}

/// ヘッダー値を検証 (CR, LF, NUL を禁止)
pub fn validate_header_value(value: &str) -> Result<()> {
    if value.bytes().any(|b| b == b'\r' || b == b'\n' || b == 0) {
        return Err(Error::InvalidHeader(format!(
            "invalid header value: {:?}",
            value
        )));
    }
    Ok(())
}

/// ヘッダー名を Title-Case に変換
///
/// ```rust
/// use http11_toolkit::headers::title_case;
///
/// assert_eq!(title_case("content-type"), "Content-Type");
/// assert_eq!(title_case("X-CUSTOM-header"), "X-Custom-Header");
/// ```
pub fn title_case(name: &str) -> String {
    name.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    let mut s = first.to_ascii_uppercase().to_string();
                    s.push_str(&chars.as_str().to_ascii_lowercase());
                    s
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// ヘッダー値として受け付ける型 (文字列、または文字列の列)
pub trait IntoHeaderValues {
    /// 値の列に変換
    fn into_header_values(self) -> Vec<String>;
}

impl IntoHeaderValues for &str {
    fn into_header_values(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoHeaderValues for String {
    fn into_header_values(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoHeaderValues for &String {
    fn into_header_values(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl IntoHeaderValues for Vec<String> {
    fn into_header_values(self) -> Vec<String> {
        self
    }
}

impl IntoHeaderValues for Vec<&str> {
    fn into_header_values(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

impl IntoHeaderValues for &[&str] {
    fn into_header_values(self) -> Vec<String> {
        self.iter().map(|v| v.to_string()).collect()
    }
}

impl IntoHeaderValues for &[String] {
    fn into_header_values(self) -> Vec<String> {
        self.to_vec()
    }
}

impl<const N: usize> IntoHeaderValues for [&str; N] {
    fn into_header_values(self) -> Vec<String> {
        self.iter().map(|v| v.to_string()).collect()
    }
}

/// ヘッダーマップ
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, Vec<String>)>,
}

impl HeaderMap {
    /// 空のヘッダーマップを作成
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// 値の列を取得 (大文字小文字を区別しない)
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.position(name).map(|i| self.entries[i].1.as_slice())
    }

    /// ヘッダーが存在するか確認
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// 値を置き換える (存在しなければ末尾に追加)
    pub fn set(&mut self, name: &str, values: Vec<String>) {
        match self.position(name) {
            Some(i) => self.entries[i].1 = values,
            None => self.entries.push((name.to_ascii_lowercase(), values)),
        }
    }

    /// 値を追加する (存在しなければ作成)
    pub fn append(&mut self, name: &str, values: Vec<String>) {
        match self.position(name) {
            Some(i) => self.entries[i].1.extend(values),
            None => self.entries.push((name.to_ascii_lowercase(), values)),
        }
    }

    /// ヘッダーを削除
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.position(name).map(|i| self.entries.remove(i).1)
    }

    /// 挿入順に (小文字の名前, 値の列) を列挙
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    /// ヘッダー名の数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 空かどうか
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// リクエストとレスポンスに共通の部分
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBase {
    pub(crate) protocol_version: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Body,
}

impl Default for MessageBase {
    fn default() -> Self {
        Self {
            protocol_version: "1.1".to_string(),
            headers: HeaderMap::new(),
            body: Body::new(),
        }
    }
}

/// HTTP メッセージ操作のための共通トレイト
///
/// `with_*` は常に新しい値を返し、元の値は変更しない。
pub trait HttpMessage: Clone {
    /// 共通部分を取得
    fn base(&self) -> &MessageBase;

    /// 共通部分を可変で取得
    fn base_mut(&mut self) -> &mut MessageBase;

    /// プロトコルバージョンを取得 (例: "1.1")
    fn protocol_version(&self) -> &str {
        &self.base().protocol_version
    }

    /// ヘッダーマップを取得
    fn headers(&self) -> &HeaderMap {
        &self.base().headers
    }

    /// ヘッダーが存在するか確認 (大文字小文字を区別しない)
    fn has_header(&self, name: &str) -> bool {
        self.headers().contains(name)
    }

    /// ヘッダーをカンマ区切りで取得 (存在しなければ空文字列)
    fn header(&self, name: &str) -> String {
        self.header_lines(name).join(",")
    }

    /// ヘッダーの値の列を取得 (存在しなければ空)
    fn header_lines(&self, name: &str) -> &[String] {
        self.headers().get(name).unwrap_or(&[])
    }

    /// ボディを取得
    fn body(&self) -> &Body {
        &self.base().body
    }

    /// ボディを可変で取得
    fn body_mut(&mut self) -> &mut Body {
        &mut self.base_mut().body
    }

    /// Content-Length ヘッダーの値を取得
    fn content_length(&self) -> Option<usize> {
        self.header_lines("Content-Length")
            .first()
            .and_then(|v| v.trim().parse().ok())
    }

    /// Transfer-Encoding の最後のトークンが chunked かどうか (RFC 9112)
    fn is_chunked(&self) -> bool {
        self.header_lines("Transfer-Encoding")
            .iter()
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .last()
            .is_some_and(|t| t.eq_ignore_ascii_case("chunked"))
    }

    /// プロトコルバージョンを変更
    fn with_protocol_version(&self, version: &str) -> Self {
        let mut message = self.clone();
        message.base_mut().protocol_version = version.to_string();
        message
    }

    /// ヘッダーを置き換える
    fn with_header<V: IntoHeaderValues>(&self, name: &str, values: V) -> Result<Self> {
        let values = checked_values(name, values)?;
        let mut message = self.clone();
        message.base_mut().headers.set(name, values);
        Ok(message)
    }

    /// ヘッダーに値を追加する
    fn with_added_header<V: IntoHeaderValues>(&self, name: &str, values: V) -> Result<Self> {
        let values = checked_values(name, values)?;
        let mut message = self.clone();
        message.base_mut().headers.append(name, values);
        Ok(message)
    }

    /// ヘッダーを削除する
    fn without_header(&self, name: &str) -> Self {
        let mut message = self.clone();
        message.base_mut().headers.remove(name);
        message
    }

    /// ボディを置き換える
    fn with_body<B: Into<Body>>(&self, body: B) -> Self {
        let mut message = self.clone();
        message.base_mut().body = body.into();
        message
    }
}

fn checked_values<V: IntoHeaderValues>(name: &str, values: V) -> Result<Vec<String>> {
    validate_header_name(name)?;
    let values = values.into_header_values();
    for value in &values {
        validate_header_value(value)?;
    }
    Ok(values)
}
