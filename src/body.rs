//! メッセージボディ
//!
//! メモリ上のバイト列と読み取り位置を持つストリーム。
//! 読み取りはカーソルを進め、書き込みは常に末尾に追加する。

use std::io::{self, Read, Seek, SeekFrom, Write};

/// メッセージボディ
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    data: Vec<u8>,
    position: usize,
}

impl Body {
    /// 空のボディを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 全体のバイト列を取得 (カーソルは動かさない)
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// バイト列を取り出す
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// 全体を文字列として取得 (不正な UTF-8 は置換)
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    /// カーソル以降の残りを読み取り、カーソルを末尾に移動
    pub fn contents(&mut self) -> &[u8] {
        let start = self.position.min(self.data.len());
        self.position = self.data.len();
        &self.data[start..]
    }

    /// サイズ
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 空かどうか
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 現在の読み取り位置
    pub fn position(&self) -> usize {
        self.position
    }

    /// 末尾まで読み取ったかどうか
    pub fn eof(&self) -> bool {
        self.position >= self.data.len()
    }

    /// 読み取り位置を先頭に戻す
    pub fn rewind(&mut self) {
        self.position = 0;
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let start = self.position.min(self.data.len());
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        self.position = start + n;
        Ok(n)
    }
}

impl Write for Body {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for Body {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset as i128),
            SeekFrom::End(offset) => Some(self.data.len() as i128 + offset as i128),
            SeekFrom::Current(offset) => Some(self.position as i128 + offset as i128),
        };
        match target {
            Some(target) if target >= 0 && target <= usize::MAX as i128 => {
                self.position = target as usize;
                Ok(target as u64)
            }
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative position",
            )),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(data: Vec<u8>) -> Self {
        Self { data, position: 0 }
    }
}

impl From<&[u8]> for Body {
    fn from(data: &[u8]) -> Self {
        Self::from(data.to_vec())
    }
}

impl From<String> for Body {
    fn from(data: String) -> Self {
        Self::from(data.into_bytes())
    }
}

impl From<&str> for Body {
    fn from(data: &str) -> Self {
        Self::from(data.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_advances_cursor() {
        let mut body = Body::from("hello world");
        let mut buf = [0u8; 5];
        assert_eq!(body.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");
        assert_eq!(body.position(), 5);
        assert!(!body.eof());
        assert_eq!(body.contents(), b" world");
        assert!(body.eof());
        assert_eq!(body.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_write_appends() {
        let mut body = Body::from("abc");
        body.seek(SeekFrom::Start(1)).unwrap();
        body.write_all(b"def").unwrap();
        assert_eq!(body.as_bytes(), b"abcdef");
        assert_eq!(body.position(), 1);
    }

    #[test]
    fn test_seek_and_rewind() {
        let mut body = Body::from("0123456789");
        assert_eq!(body.seek(SeekFrom::End(-3)).unwrap(), 7);
        assert_eq!(body.contents(), b"789");
        body.rewind();
        assert_eq!(body.position(), 0);
        assert_eq!(body.seek(SeekFrom::Current(2)).unwrap(), 2);
        assert!(body.seek(SeekFrom::Current(-5)).is_err());

        // 末尾より後ろへの seek は読み取り 0 バイト
        body.seek(SeekFrom::Start(100)).unwrap();
        assert!(body.eof());
        assert_eq!(body.contents(), b"");
    }

    #[test]
    fn test_clone_is_independent() {
        let mut original = Body::from("x");
        let copy = original.clone();
        original.write_all(b"y").unwrap();
        assert_eq!(copy.as_bytes(), b"x");
        assert_eq!(original.to_string_lossy(), "xy");
    }
}
