//! Content-Encoding の展開
//!
//! RFC 9110 Section 8.4 (Content-Encoding) のうち `gzip` と `deflate` を扱う。
//! 展開処理は `gzip` feature (デフォルト有効) で `flate2` を使う。

use core::fmt;

/// 圧縮/展開エラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressionError {
    /// 入力データが不正
    InvalidData(String),
    /// 展開後のサイズが上限を超えた
    TooLarge { limit: usize },
    /// サポートしていない Content-Encoding
    Unsupported(String),
}

impl fmt::Display for CompressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionError::InvalidData(msg) => write!(f, "invalid data: {}", msg),
            CompressionError::TooLarge { limit } => {
                write!(f, "decoded body exceeds {} bytes", limit)
            }
            CompressionError::Unsupported(coding) => {
                write!(f, "unsupported content coding: {}", coding)
            }
        }
    }
}

impl std::error::Error for CompressionError {}

/// Content-Encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCoding {
    /// gzip (RFC 1952)
    Gzip,
    /// deflate (zlib RFC 1950、raw deflate も許容)
    Deflate,
}

impl ContentCoding {
    /// ヘッダー値から判定 (大文字小文字を区別しない)
    ///
    /// `x-gzip` は `gzip` と同じ扱い。それ以外は `None`。
    pub fn from_header(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("gzip") || value.eq_ignore_ascii_case("x-gzip") {
            Some(ContentCoding::Gzip)
        } else if value.eq_ignore_ascii_case("deflate") {
            Some(ContentCoding::Deflate)
        } else {
            None
        }
    }

    /// トークン名
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCoding::Gzip => "gzip",
            ContentCoding::Deflate => "deflate",
        }
    }
}

/// 圧縮されたボディを展開する
///
/// 展開後のサイズが `limit` を超えた場合は `TooLarge`。
#[cfg(feature = "gzip")]
pub fn inflate(
    coding: ContentCoding,
    data: &[u8],
    limit: usize,
) -> Result<Vec<u8>, CompressionError> {
    use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};

    match coding {
        ContentCoding::Gzip => read_limited(GzDecoder::new(data), limit),
        ContentCoding::Deflate => match read_limited(ZlibDecoder::new(data), limit) {
            Err(CompressionError::InvalidData(_)) => {
                // zlib ヘッダーなしの raw deflate を送るサーバーがある
                read_limited(DeflateDecoder::new(data), limit)
            }
            result => result,
        },
    }
}

/// 圧縮されたボディを展開する (`gzip` feature 無効時は常にエラー)
#[cfg(not(feature = "gzip"))]
pub fn inflate(
    coding: ContentCoding,
    _data: &[u8],
    _limit: usize,
) -> Result<Vec<u8>, CompressionError> {
    Err(CompressionError::Unsupported(coding.as_str().to_string()))
}

#[cfg(feature = "gzip")]
fn read_limited<R: std::io::Read>(reader: R, limit: usize) -> Result<Vec<u8>, CompressionError> {
    use std::io::Read;

    let mut output = Vec::new();
    reader
        .take(limit as u64 + 1)
        .read_to_end(&mut output)
        .map_err(|e| CompressionError::InvalidData(e.to_string()))?;
    if output.len() > limit {
        return Err(CompressionError::TooLarge { limit });
    }
    Ok(output)
}
