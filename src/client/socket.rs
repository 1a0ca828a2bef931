//! 生ソケットによるトランスポート
//!
//! 1 リクエストごとに TCP 接続 (https なら TLS) を張り、`Connection: close`
//! で送信してレスポンスを読み切る。

use std::io::{self, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, StreamOwned};
use rustls_platform_verifier::ConfigVerifierExt;

use crate::client::{ClientOptions, Transport};
use crate::decoder::ResponseDecoder;
use crate::error::{Error, Result};
use crate::headers::HttpMessage;
use crate::limits::TransportLimits;
use crate::request::Request;
use crate::response::Response;

/// TCP / TLS ソケットで送受信するトランスポート
#[derive(Debug, Clone, Default)]
pub struct SocketTransport {
    tls_config: Option<Arc<ClientConfig>>,
    limits: TransportLimits,
}

impl SocketTransport {
    /// プラットフォームの証明書検証を使うトランスポートを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// TLS 設定を指定
    pub fn tls_config(mut self, config: Arc<ClientConfig>) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// レスポンス読み取りの制限を指定
    pub fn limits(mut self, limits: TransportLimits) -> Self {
        self.limits = limits;
        self
    }

    fn connect(&self, host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
        let address = format!("{}:{}", host, port);
        let addrs: Vec<SocketAddr> = address
            .to_socket_addrs()
            .map_err(|source| Error::Connect {
                address: address.clone(),
                source,
            })?
            .collect();

        let mut last_error = io::Error::new(io::ErrorKind::NotFound, "no addresses resolved");
        for addr in addrs {
            let result = if timeout.is_zero() {
                TcpStream::connect(addr)
            } else {
                TcpStream::connect_timeout(&addr, timeout)
            };
            match result {
                Ok(stream) => {
                    tracing::debug!(%addr, "connected");
                    return Ok(stream);
                }
                Err(e) => {
                    tracing::debug!(%addr, error = %e, "connect failed");
                    last_error = e;
                }
            }
        }
        Err(Error::Connect {
            address,
            source: last_error,
        })
    }

    fn tls_stream(
        &self,
        host: &str,
        sock: TcpStream,
    ) -> Result<StreamOwned<ClientConnection, TcpStream>> {
        let config = match &self.tls_config {
            Some(config) => config.clone(),
            None => Arc::new(
                ClientConfig::with_platform_verifier().map_err(|e| Error::Tls(e.to_string()))?,
            ),
        };
        let server_name = ServerName::try_from(host.to_string())?;
        let conn = ClientConnection::new(config, server_name)?;
        Ok(StreamOwned::new(conn, sock))
    }

    fn exchange<S: Read + Write>(
        &self,
        mut stream: S,
        request: &Request,
        options: &ClientOptions,
    ) -> Result<Response> {
        stream.write_all(&request.raw_message())?;
        stream.flush()?;

        let decoder = ResponseDecoder::with_limits(self.limits.clone())
            .dechunk(options.dechunk_content)
            .decode(options.decode_content);
        let mut reader = BufReader::new(stream);
        decoder.read_response(&mut reader)
    }
}

impl Transport for SocketTransport {
    fn send(&mut self, request: &Request, options: &ClientOptions) -> Result<Response> {
        let uri = request.uri().ok_or(Error::MissingHost)?;
        if uri.host().is_empty() {
            return Err(Error::MissingHost);
        }
        let host = uri.host();
        let port = uri.port_or_default();
        let started = Instant::now();

        let sock = self.connect(host, port, options.connection_timeout)?;
        if !options.timeout.is_zero() {
            sock.set_read_timeout(Some(options.timeout))?;
            sock.set_write_timeout(Some(options.timeout))?;
        }

        let request = prepare_request(request)?;
        tracing::debug!(
            host,
            port,
            method = %request.method(),
            request_target = %request.request_target(),
            "sending over socket"
        );

        let result = if uri.scheme() == "https" {
            let tls = self.tls_stream(host, sock)?;
            self.exchange(EofTolerant(tls), &request, options)
        } else {
            self.exchange(sock, &request, options)
        };

        result.map_err(|e| match e {
            Error::Io(io)
                if matches!(
                    io.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                Error::Timeout {
                    elapsed: started.elapsed(),
                    limit: options.timeout,
                }
            }
            e => e,
        })
    }
}

/// 送信前のリクエストを整える
///
/// `Connection: close` を付け、ボディがあれば `Content-Length` をその長さにする。
fn prepare_request(request: &Request) -> Result<Request> {
    let mut request = request.with_header("Connection", "close")?;
    if !request.body().is_empty() {
        request = request.with_header("Content-Length", request.body().len().to_string())?;
    }
    Ok(request)
}

/// close_notify なしで切断する TLS サーバーを EOF として扱う
struct EofTolerant<S>(S);

impl<S: Read> Read for EofTolerant<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.0.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(0),
            result => result,
        }
    }
}

impl<S: Write> Write for EofTolerant<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}
