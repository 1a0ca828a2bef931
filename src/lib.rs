//! # http11_toolkit
//!
//! HTTP/1.1 メッセージツールキット
//!
//! ## 特徴
//!
//! - **不変メッセージ**: `Request` / `Response` の `with_*` は常に新しい値を返す
//! - **生ソケットクライアント**: chunked 解除、gzip / deflate 展開、タイムアウト、
//!   リダイレクト追従、Cookie の引き継ぎを自前で行う
//! - **ミドルウェアディスパッチャー**: 右畳み込みのチェーンと伝播停止
//!
//! ## 使い方
//!
//! ### クライアント
//!
//! ```no_run
//! use http11_toolkit::{Client, HttpMessage, Request};
//!
//! let mut client = Client::new();
//! let request = Request::new("GET", "http://example.com/")
//!     .unwrap()
//!     .with_header("Accept", "*/*")
//!     .unwrap();
//! let response = client.send(request).unwrap();
//! println!("{}", response.status_code());
//! ```
//!
//! ### メッセージのエンコードとデコード
//!
//! ```rust
//! use std::io::Cursor;
//! use http11_toolkit::{HttpMessage, Request, Response, ResponseDecoder};
//!
//! let request = Request::new("GET", "http://example.com/index.html").unwrap();
//! assert_eq!(
//!     request.raw_message(),
//!     b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n"
//! );
//!
//! let response = Response::new(200).unwrap().with_body("hi");
//! let mut wire = Vec::new();
//! response.write_to(&mut wire).unwrap();
//! let decoded = ResponseDecoder::new()
//!     .read_response(&mut Cursor::new(wire))
//!     .unwrap();
//! assert_eq!(decoded.body().as_bytes(), b"hi");
//! ```
//!
//! ### サーバー
//!
//! ```rust
//! use http11_toolkit::server::{self, Propagation, ServerRequest};
//! use http11_toolkit::{HttpMessage, Request, Response, Server};
//!
//! let mut app = Server::new(ServerRequest::new(Request::default()));
//! app.append_middleware(server::post(
//!     |_request: &ServerRequest, response: Response, _: &mut Propagation| {
//!         Ok(response.with_body("Hello, World!"))
//!     },
//! ));
//! let response = app.handle(Response::default()).unwrap();
//! let mut out = Vec::new();
//! server::emit(&response, &mut out).unwrap();
//! ```

mod body;
pub mod client;
pub mod compression;
pub mod cookie;
pub mod date;
mod decoder;
mod encoder;
mod error;
pub mod headers;
mod limits;
mod request;
mod response;
pub mod server;
pub mod uri;

pub use body::Body;
pub use client::{Client, ClientOptions, SocketTransport, Transport};
pub use decoder::ResponseDecoder;
pub use encoder::encode_request;
pub use error::{Error, Result};
pub use headers::{HeaderMap, HttpMessage, MessageBase};
pub use limits::TransportLimits;
pub use request::{Method, Request};
pub use response::{Response, reason_phrase};
pub use server::Server;
pub use uri::Uri;
