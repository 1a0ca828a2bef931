//! ソケットクライアントのテスト
//!
//! 同じプロセス内の `TcpListener` を相手に、実際のソケットで送受信する。
//! サーバー側は 1 接続ごとに用意したレスポンスを 1 つ書いて切断する。

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use http11_toolkit::{Client, ClientOptions, Error, HttpMessage, Request};

/// 用意したレスポンスを順に返すサーバーを起動する
///
/// 戻り値は `http://127.0.0.1:port` と、受け取った生リクエストを返すハンドル。
fn serve(responses: Vec<Vec<u8>>) -> (String, thread::JoinHandle<Vec<String>>) {
    serve_with_delay(responses, Duration::ZERO)
}

fn serve_with_delay(
    responses: Vec<Vec<u8>>,
    delay: Duration,
) -> (String, thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let mut requests = Vec::new();
        for response in responses {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            requests.push(read_request(&mut reader));
            thread::sleep(delay);
            let mut stream = stream;
            // クライアントが先に諦めた場合は書き込みに失敗してよい
            let _ = stream.write_all(&response);
        }
        requests
    });
    (format!("http://{}", addr), handle)
}

fn read_request<R: BufRead>(reader: &mut R) -> String {
    let mut raw = String::new();
    let mut content_length = 0;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap() == 0 {
            break;
        }
        if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
            content_length = value.trim().parse().unwrap();
        }
        raw.push_str(&line);
        if line == "\r\n" {
            break;
        }
    }
    let mut body = vec![0; content_length];
    reader.read_exact(&mut body).unwrap();
    raw.push_str(&String::from_utf8_lossy(&body));
    raw
}

fn chunked(parts: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for part in parts {
        out.extend_from_slice(format!("{:x}\r\n", part.len()).as_bytes());
        out.extend_from_slice(part);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"0\r\n\r\n");
    out
}

#[test]
fn plain_response_with_content_length() {
    let (base, server) = serve(vec![
        b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\n\r\nhello".to_vec(),
    ]);

    let mut client = Client::new();
    let response = client
        .send(Request::new("GET", &format!("{}/index.txt", base)).unwrap())
        .unwrap();

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.reason_phrase(), "OK");
    assert_eq!(response.header("content-type"), "text/plain");
    assert_eq!(response.body().as_bytes(), b"hello");

    let requests = server.join().unwrap();
    assert!(requests[0].starts_with("GET /index.txt HTTP/1.1\r\n"));
    assert!(requests[0].contains("Connection: close\r\n"));
    assert!(requests[0].contains("Host: 127.0.0.1:"));
}

#[test]
fn chunked_response_is_reassembled() {
    let mut raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n".to_vec();
    raw.extend_from_slice(&chunked(&[b"Wiki", b"pedia ", b"in \r\nchunks."]));
    let (base, server) = serve(vec![raw]);

    let response = Client::new()
        .send(Request::new("GET", &base).unwrap())
        .unwrap();
    assert_eq!(response.body().as_bytes(), b"Wikipedia in \r\nchunks.");
    server.join().unwrap();
}

#[test]
fn chunked_response_kept_when_dechunk_disabled() {
    let body = chunked(&[b"abc"]);
    let mut raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n".to_vec();
    raw.extend_from_slice(&body);
    let (base, server) = serve(vec![raw]);

    let options = ClientOptions::new().dechunk_content(false);
    let response = Client::with_options(options)
        .send(Request::new("GET", &base).unwrap())
        .unwrap();
    assert_eq!(response.body().as_bytes(), body.as_slice());
    server.join().unwrap();
}

#[cfg(feature = "gzip")]
#[test]
fn gzip_chunked_response_is_inflated() {
    use flate2::Compression;
    use flate2::write::GzEncoder;

    let text = "compressed payload ".repeat(50);
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    let compressed = encoder.finish().unwrap();
    let (first, second) = compressed.split_at(compressed.len() / 2);

    let mut raw =
        b"HTTP/1.1 200 OK\r\nContent-Encoding: gzip\r\nTransfer-Encoding: chunked\r\n\r\n".to_vec();
    raw.extend_from_slice(&chunked(&[first, second]));
    let (base, server) = serve(vec![raw.clone(), raw]);

    let response = Client::new()
        .send(Request::new("GET", &base).unwrap())
        .unwrap();
    assert_eq!(response.body().to_string_lossy(), text);

    // 展開しない設定では圧縮されたまま
    let options = ClientOptions::new().decode_content(false);
    let response = Client::with_options(options)
        .send(Request::new("GET", &base).unwrap())
        .unwrap();
    assert_eq!(response.body().as_bytes(), compressed.as_slice());
    server.join().unwrap();
}

#[cfg(feature = "gzip")]
#[test]
fn decode_without_dechunk_is_rejected() {
    let mut raw =
        b"HTTP/1.1 200 OK\r\nContent-Encoding: gzip\r\nTransfer-Encoding: chunked\r\n\r\n".to_vec();
    raw.extend_from_slice(&chunked(&[b"not really gzip"]));
    let (base, server) = serve(vec![raw]);

    let options = ClientOptions::new().dechunk_content(false);
    let result = Client::with_options(options).send(Request::new("GET", &base).unwrap());
    assert!(matches!(result, Err(Error::DecodeWithoutDechunk)));
    server.join().unwrap();
}

#[test]
fn post_body_is_sent_with_content_length() {
    let (base, server) = serve(vec![b"HTTP/1.1 201 Created\r\n\r\n".to_vec()]);

    let request = Request::new("POST", &format!("{}/items", base))
        .unwrap()
        .with_header("Content-Type", "application/json")
        .unwrap()
        .with_body(r#"{"a":1}"#);
    let response = Client::new().send(request).unwrap();
    assert_eq!(response.status_code(), 201);
    assert!(response.body().is_empty());

    let requests = server.join().unwrap();
    assert!(requests[0].starts_with("POST /items HTTP/1.1\r\n"));
    assert!(requests[0].contains("Content-Length: 7\r\n"));
    assert!(requests[0].ends_with("\r\n\r\n{\"a\":1}"));
}

#[test]
fn redirect_carries_cookies() {
    let (base, server) = serve(vec![
        b"HTTP/1.1 302 Found\r\nLocation: /next?step=2\r\nSet-Cookie: sid=abc; Path=/\r\nSet-Cookie: secret=1; Secure\r\nContent-Length: 0\r\n\r\n"
            .to_vec(),
        b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\ndone".to_vec(),
    ]);

    let mut client = Client::new();
    let response = client
        .send(Request::new("GET", &format!("{}/start", base)).unwrap())
        .unwrap();
    assert_eq!(response.body().as_bytes(), b"done");
    assert_eq!(client.redirections(), 1);

    let requests = server.join().unwrap();
    assert!(requests[0].starts_with("GET /start HTTP/1.1\r\n"));
    assert!(!requests[0].contains("Cookie:"));
    assert!(requests[1].starts_with("GET /next?step=2 HTTP/1.1\r\n"));
    assert!(requests[1].contains("Cookie: sid=abc\r\n"));
    assert!(!requests[1].contains("secret"));
}

#[test]
fn bodyless_encoded_redirect_is_followed() {
    let (base, server) = serve(vec![
        b"HTTP/1.1 302 Found\r\nLocation: /moved\r\nContent-Encoding: gzip\r\n\r\n".to_vec(),
        b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nmoved".to_vec(),
    ]);

    let mut client = Client::new();
    let response = client
        .send(Request::new("GET", &format!("{}/old", base)).unwrap())
        .unwrap();
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.body().as_bytes(), b"moved");
    assert_eq!(client.redirections(), 1);

    let requests = server.join().unwrap();
    assert!(requests[1].starts_with("GET /moved HTTP/1.1\r\n"));
}

#[test]
fn redirect_limit_over_socket() {
    let redirect =
        b"HTTP/1.1 301 Moved Permanently\r\nLocation: /again\r\nContent-Length: 0\r\n\r\n".to_vec();
    let (base, server) = serve(vec![redirect.clone(), redirect]);

    let options = ClientOptions::new().max_redirections(1);
    let mut client = Client::with_options(options);
    let result = client.send(Request::new("GET", &base).unwrap());
    assert!(matches!(result, Err(Error::RedirectLimitExceeded { max: 1 })));
    assert_eq!(server.join().unwrap().len(), 2);
}

#[test]
fn malformed_status_line_is_rejected() {
    let (base, server) = serve(vec![b"SSH-2.0-OpenSSH_9.6\r\n\r\n".to_vec()]);
    let result = Client::new().send(Request::new("GET", &base).unwrap());
    assert!(matches!(result, Err(Error::MalformedResponse(_))));
    server.join().unwrap();
}

#[test]
fn unknown_status_code_is_rejected() {
    let (base, server) = serve(vec![b"HTTP/1.1 299 Whatever\r\n\r\n".to_vec()]);
    let result = Client::new().send(Request::new("GET", &base).unwrap());
    assert!(matches!(result, Err(Error::InvalidStatusCode(299))));
    server.join().unwrap();
}

#[test]
fn invalid_chunk_size_is_rejected() {
    let (base, server) = serve(vec![
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\nbody\r\n0\r\n\r\n".to_vec(),
    ]);
    let result = Client::new().send(Request::new("GET", &base).unwrap());
    assert!(matches!(result, Err(Error::NotChunked(line)) if line == "zz"));
    server.join().unwrap();
}

#[test]
fn connection_refused() {
    // 一度 bind してすぐ閉じたポートには誰もいない
    let addr = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();

    let options = ClientOptions::new().connection_timeout(Duration::from_secs(2));
    let result = Client::with_options(options)
        .send(Request::new("GET", &format!("http://{}/", addr)).unwrap());
    match result {
        Err(Error::Connect { address, .. }) => assert_eq!(address, addr.to_string()),
        other => panic!("unexpected result: {:?}", other.map(|r| r.status_code())),
    }
}

#[test]
fn slow_server_times_out() {
    let (base, server) = serve_with_delay(
        vec![b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok".to_vec()],
        Duration::from_millis(500),
    );

    let options = ClientOptions::new().timeout(Duration::from_millis(100));
    let result = Client::with_options(options).send(Request::new("GET", &base).unwrap());
    assert!(matches!(result, Err(Error::Timeout { .. })));
    server.join().unwrap();
}

#[test]
fn zero_timeout_disables_socket_deadline() {
    let (base, server) = serve_with_delay(
        vec![b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok".to_vec()],
        Duration::from_millis(50),
    );

    // 0 はタイムアウトなし
    let options = ClientOptions::new().timeout(Duration::ZERO);
    let response = Client::with_options(options)
        .send(Request::new("GET", &base).unwrap())
        .unwrap();
    assert_eq!(response.body().as_bytes(), b"ok");
    server.join().unwrap();
}

#[test]
fn response_without_length_reads_to_eof() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        read_request(&mut reader);
        let mut stream: TcpStream = stream;
        stream.write_all(b"HTTP/1.0 200 OK\r\n\r\n").unwrap();
        for part in ["streamed ", "until ", "close"] {
            stream.write_all(part.as_bytes()).unwrap();
            stream.flush().unwrap();
            thread::sleep(Duration::from_millis(10));
        }
    });

    let response = Client::new()
        .send(Request::new("GET", &format!("http://{}/", addr)).unwrap())
        .unwrap();
    assert_eq!(response.protocol_version(), "1.0");
    assert_eq!(response.body().as_bytes(), b"streamed until close");
    server.join().unwrap();
}
