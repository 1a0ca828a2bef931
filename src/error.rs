use std::fmt;
use std::time::Duration;

use crate::compression::CompressionError;
use crate::uri::UriError;

/// http11_toolkit エラー
#[derive(Debug)]
pub enum Error {
    /// サポートしていない HTTP メソッド
    InvalidMethod(String),
    /// ステータステーブルにないステータスコード
    InvalidStatusCode(u16),
    /// 不正なヘッダー名または値
    InvalidHeader(String),
    /// URI エラー
    Uri(UriError),
    /// I/O エラー
    Io(std::io::Error),
    /// 接続エラー
    Connect {
        address: String,
        source: std::io::Error,
    },
    /// TLS エラー
    Tls(String),
    /// リクエストに接続先ホストがない
    MissingHost,
    /// レスポンスの先頭部分が不正
    MalformedResponse(String),
    /// チャンクサイズ行が 16 進数ではない
    NotChunked(String),
    /// chunked のままのボディを展開しようとした
    DecodeWithoutDechunk,
    /// 圧縮/展開エラー
    Compression(CompressionError),
    /// タイムアウト
    Timeout { elapsed: Duration, limit: Duration },
    /// ヘッダー行が長すぎる
    HeaderLineTooLong { size: usize, limit: usize },
    /// ヘッダー数超過
    TooManyHeaders { count: usize, limit: usize },
    /// ボディサイズ超過
    BodyTooLarge { size: usize, limit: usize },
    /// リダイレクト回数の上限を超えた
    RedirectLimitExceeded { max: usize },
    /// リダイレクトレスポンスに Location がない
    MissingLocation { status_code: u16 },
    /// 構造化ボディのパースエラー
    Parse(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidMethod(method) => write!(f, "invalid request method: {:?}", method),
            Error::InvalidStatusCode(code) => write!(f, "invalid status code: {}", code),
            Error::InvalidHeader(msg) => write!(f, "invalid header: {}", msg),
            Error::Uri(e) => write!(f, "URI error: {}", e),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Connect { address, source } => {
                let code = source
                    .raw_os_error()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "-".to_string());
                write!(f, "socket error: {} - {} ({})", code, source, address)
            }
            Error::Tls(msg) => write!(f, "TLS error: {}", msg),
            Error::MissingHost => write!(f, "request has no host to connect to"),
            Error::MalformedResponse(msg) => write!(f, "malformed response: {}", msg),
            Error::NotChunked(line) => {
                write!(f, "most likely not chunked encoding: {:?}", line)
            }
            Error::DecodeWithoutDechunk => {
                write!(f, "unable to decode chunked data without dechunking")
            }
            Error::Compression(e) => write!(f, "compression error: {}", e),
            Error::Timeout { elapsed, limit } => write!(
                f,
                "timeout exceeded: {:.3}s > {:.3}s",
                elapsed.as_secs_f64(),
                limit.as_secs_f64()
            ),
            Error::HeaderLineTooLong { size, limit } => {
                write!(f, "header line too long: {} > {}", size, limit)
            }
            Error::TooManyHeaders { count, limit } => {
                write!(f, "too many headers: {} > {}", count, limit)
            }
            Error::BodyTooLarge { size, limit } => {
                write!(f, "body too large: {} > {}", size, limit)
            }
            Error::RedirectLimitExceeded { max } => {
                write!(f, "redirection limit exceeded (max {})", max)
            }
            Error::MissingLocation { status_code } => {
                write!(f, "missing Location header on {} redirection", status_code)
            }
            Error::Parse(msg) => write!(f, "parse error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Uri(e) => Some(e),
            Error::Io(e) => Some(e),
            Error::Connect { source, .. } => Some(source),
            Error::Compression(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<UriError> for Error {
    fn from(e: UriError) -> Self {
        Error::Uri(e)
    }
}

impl From<CompressionError> for Error {
    fn from(e: CompressionError) -> Self {
        Error::Compression(e)
    }
}

impl From<rustls::Error> for Error {
    fn from(e: rustls::Error) -> Self {
        Error::Tls(e.to_string())
    }
}

impl From<rustls::pki_types::InvalidDnsNameError> for Error {
    fn from(e: rustls::pki_types::InvalidDnsNameError) -> Self {
        Error::Tls(e.to_string())
    }
}

/// Result 型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
