//! レスポンスデコーダー
//!
//! ブロッキングな `BufRead` からステータス行とヘッダーを読み取り、
//! ボディを chunked 解除と Content-Encoding 展開をしながら組み立てる。

use std::io::{BufRead, Read};

use crate::compression::{ContentCoding, inflate};
use crate::error::{Error, Result};
use crate::headers::HttpMessage;
use crate::limits::TransportLimits;
use crate::response::Response;

/// 非 chunked ボディの読み取り単位
const READ_CHUNK_SIZE: usize = 4096;

/// レスポンスデコーダー
///
/// ```rust
/// use std::io::Cursor;
/// use http11_toolkit::{HttpMessage, ResponseDecoder};
///
/// let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n";
/// let response = ResponseDecoder::new()
///     .read_response(&mut Cursor::new(&raw[..]))
///     .unwrap();
/// assert_eq!(response.status_code(), 200);
/// assert_eq!(response.body().as_bytes(), b"hello");
/// ```
#[derive(Debug, Clone)]
pub struct ResponseDecoder {
    limits: TransportLimits,
    dechunk: bool,
    decode: bool,
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseDecoder {
    /// 新しいデコーダーを作成 (chunked 解除と展開を行う)
    pub fn new() -> Self {
        Self::with_limits(TransportLimits::default())
    }

    /// 制限設定付きでデコーダーを作成
    pub fn with_limits(limits: TransportLimits) -> Self {
        Self {
            limits,
            dechunk: true,
            decode: true,
        }
    }

    /// chunked 転送エンコーディングを解除するかどうか
    pub fn dechunk(mut self, dechunk: bool) -> Self {
        self.dechunk = dechunk;
        self
    }

    /// Content-Encoding (gzip / deflate) を展開するかどうか
    pub fn decode(mut self, decode: bool) -> Self {
        self.decode = decode;
        self
    }

    /// 制限設定を取得
    pub fn limits(&self) -> &TransportLimits {
        &self.limits
    }

    /// レスポンス全体を読み取る
    pub fn read_response<R: BufRead>(&self, reader: &mut R) -> Result<Response> {
        let head = self.read_head(reader)?;
        let body = self.read_body(reader, &head)?;
        Ok(head.with_body(body))
    }

    /// ステータス行とヘッダーを読み取る
    ///
    /// 先頭の空行は読み飛ばす。ヘッダーは最初の空行 (または EOF) まで。
    pub fn read_head<R: BufRead>(&self, reader: &mut R) -> Result<Response> {
        let status_line = loop {
            match self.read_line(reader)? {
                Some(line) if line.is_empty() => continue,
                Some(line) => break line,
                None => {
                    return Err(Error::MalformedResponse(
                        "connection closed before status line".to_string(),
                    ));
                }
            }
        };

        let mut response = parse_status_line(&status_line)?;
        let mut count = 0;

        while let Some(line) = self.read_line(reader)? {
            if line.is_empty() {
                break;
            }
            count += 1;
            if count > self.limits.max_headers_count {
                return Err(Error::TooManyHeaders {
                    count,
                    limit: self.limits.max_headers_count,
                });
            }
            let (name, value) = line.split_once(':').ok_or_else(|| {
                Error::MalformedResponse(format!("invalid header line: {:?}", line))
            })?;
            let name = decode_header_text(name.trim());
            let value = decode_header_text(value.trim());
            tracing::trace!(name = %name, value = %value, "response header");
            response = response.with_added_header(name.trim(), value.trim())?;
        }

        Ok(response)
    }

    /// ボディを読み取る
    ///
    /// chunked の場合は解除し、それ以外は EOF (Content-Length があればその長さ) まで読む。
    /// その後 Content-Encoding に応じて展開する。空のボディは展開しない。
    pub fn read_body<R: BufRead>(&self, reader: &mut R, head: &Response) -> Result<Vec<u8>> {
        let chunked = head.is_chunked();
        let body = if chunked && self.dechunk {
            self.dechunk_body(reader)?
        } else {
            self.copy_body(reader, head.content_length())?
        };

        if !self.decode {
            return Ok(body);
        }
        let Some(coding) = ContentCoding::from_header(&head.header("Content-Encoding")) else {
            return Ok(body);
        };
        if chunked && !self.dechunk {
            return Err(Error::DecodeWithoutDechunk);
        }
        // ボディのないレスポンスにも Content-Encoding は付きうる
        if body.is_empty() {
            return Ok(body);
        }
        tracing::debug!(coding = coding.as_str(), size = body.len(), "inflating body");
        Ok(inflate(coding, &body, self.limits.max_body_size)?)
    }

    /// chunked ボディを解除する
    ///
    /// サイズ 0 のチャンクか EOF で終了する。
    pub fn dechunk_body<R: BufRead>(&self, reader: &mut R) -> Result<Vec<u8>> {
        let mut body = Vec::new();

        while let Some(line) = self.read_line(reader)? {
            // チャンクデータ後の CRLF
            if line.trim().is_empty() {
                continue;
            }
            let size_str = line.split(';').next().unwrap_or("").trim();
            let size = usize::from_str_radix(size_str, 16)
                .map_err(|_| Error::NotChunked(line.clone()))?;
            tracing::trace!(size, "chunk");
            if size == 0 {
                break;
            }

            let total = body.len().saturating_add(size);
            if total > self.limits.max_body_size {
                return Err(Error::BodyTooLarge {
                    size: total,
                    limit: self.limits.max_body_size,
                });
            }
            reader.by_ref().take(size as u64).read_to_end(&mut body)?;
        }

        Ok(body)
    }

    /// 非 chunked ボディを EOF まで読む
    fn copy_body<R: BufRead>(
        &self,
        reader: &mut R,
        content_length: Option<usize>,
    ) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        let mut buf = [0u8; READ_CHUNK_SIZE];
        let remaining = |len: usize| {
            content_length.map_or(READ_CHUNK_SIZE, |cl| (cl - len).min(READ_CHUNK_SIZE))
        };

        loop {
            let want = remaining(body.len());
            if want == 0 {
                break;
            }
            let n = match reader.read(&mut buf[..want]) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if body.len() + n > self.limits.max_body_size {
                return Err(Error::BodyTooLarge {
                    size: body.len() + n,
                    limit: self.limits.max_body_size,
                });
            }
            body.extend_from_slice(&buf[..n]);
        }

        Ok(body)
    }

    /// 1 行読み取る (行末の CRLF / LF は除く)
    ///
    /// EOF で何も読めなければ `None`。
    fn read_line<R: BufRead>(&self, reader: &mut R) -> Result<Option<String>> {
        let limit = self.limits.max_line_size;
        let mut buf = Vec::new();
        reader
            .by_ref()
            .take(limit.saturating_add(2) as u64)
            .read_until(b'\n', &mut buf)?;
        if buf.is_empty() {
            return Ok(None);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        if buf.len() > limit {
            return Err(Error::HeaderLineTooLong {
                size: buf.len(),
                limit,
            });
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }
}

/// ステータス行をパース (`HTTP/version SP code [SP reason]`)
///
/// 理由句はステータステーブルのものを使う。
fn parse_status_line(line: &str) -> Result<Response> {
    if !line.to_ascii_uppercase().contains("HTTP") {
        return Err(Error::MalformedResponse(format!(
            "invalid status line: {:?}",
            line
        )));
    }

    let mut parts = line.split_whitespace();
    let protocol = parts.next().unwrap_or("");
    let version = protocol
        .split_once('/')
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::MalformedResponse(format!("invalid protocol: {:?}", protocol)))?;
    let code = parts
        .next()
        .and_then(|c| c.parse::<u16>().ok())
        .ok_or_else(|| Error::MalformedResponse(format!("invalid status line: {:?}", line)))?;

    Ok(Response::new(code)?.with_protocol_version(version))
}

/// ヘッダーのテキストをパーセントデコードする
///
/// `+` は変換せず、不正なエスケープはそのまま残す。
fn decode_header_text(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(h), Some(l)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push((h << 4) | l);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}
