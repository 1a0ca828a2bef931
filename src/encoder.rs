use std::io::Write;

use crate::headers::{HttpMessage, title_case};
use crate::request::Request;
use crate::response::Response;

/// ヘッダーを書き出す
///
/// `Set-Cookie` は値ごとに 1 行、それ以外はカンマで連結して 1 行。
fn encode_headers<M: HttpMessage>(message: &M, buf: &mut Vec<u8>, eol: &[u8], split_cookies: bool) {
    for (name, values) in message.headers().iter() {
        let name = title_case(name);
        if split_cookies && name == "Set-Cookie" {
            for value in values {
                buf.extend_from_slice(name.as_bytes());
                buf.extend_from_slice(b": ");
                buf.extend_from_slice(value.as_bytes());
                buf.extend_from_slice(eol);
            }
        } else {
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(values.join(",").as_bytes());
            buf.extend_from_slice(eol);
        }
    }
}

/// リクエストをエンコード
///
/// `METHOD SP request-target SP HTTP/version CRLF`、ヘッダー、空行、ボディ。
pub fn encode_request(request: &Request) -> Vec<u8> {
    let mut buf = Vec::new();

    // Request line
    buf.extend_from_slice(request.method().as_str().as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(request.request_target().as_bytes());
    buf.extend_from_slice(b" HTTP/");
    buf.extend_from_slice(request.protocol_version().as_bytes());
    buf.extend_from_slice(b"\r\n");

    encode_headers(request, &mut buf, b"\r\n", false);

    buf.extend_from_slice(b"\r\n");
    buf.extend_from_slice(request.body().as_bytes());
    buf
}

/// レスポンスをエンコード
///
/// `eol` は行末 (ログ表示用は LF、送信用は CRLF)。
fn encode_response(response: &Response, eol: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();

    // Status line
    buf.extend_from_slice(b"HTTP/");
    buf.extend_from_slice(response.protocol_version().as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(response.status_code().to_string().as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(response.reason_phrase().as_bytes());
    buf.extend_from_slice(eol);

    encode_headers(response, &mut buf, eol, true);

    buf.extend_from_slice(eol);
    buf.extend_from_slice(response.body().as_bytes());
    buf
}

impl Request {
    /// 送信用の生メッセージ (CRLF 区切り)
    pub fn raw_message(&self) -> Vec<u8> {
        encode_request(self)
    }
}

impl Response {
    /// 表示用の生メッセージ (LF 区切り)
    pub fn raw_message(&self) -> Vec<u8> {
        encode_response(self, b"\n")
    }

    /// 出力先に CRLF 区切りで書き出す
    pub fn write_to<W: Write>(&self, sink: &mut W) -> std::io::Result<()> {
        sink.write_all(&encode_response(self, b"\r\n"))?;
        sink.flush()
    }
}
