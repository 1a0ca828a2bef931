//! リダイレクトと Cookie を扱うクライアントの例
//!
//! 使い方:
//!   cargo run -p http11_fetch -- https://example.com/
//!   cargo run -p http11_fetch -- --method POST --data 'a=1' http://httpbin.org/post
//!   RUST_LOG=http11_toolkit=debug cargo run -p http11_fetch -- http://httpbin.org/redirect/3

use std::time::Duration;

use http11_toolkit::{Client, ClientOptions, HttpMessage, Request, Response};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "http11_toolkit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = noargs::raw_args();
    args.metadata_mut().app_name = "http11_fetch";

    // --help フラグ
    noargs::HELP_FLAG.take_help(&mut args);

    // --version フラグ
    let version_flag: bool = noargs::flag("version")
        .short('V')
        .doc("Show version")
        .take(&mut args)
        .is_present();
    if version_flag {
        println!("{}", env!("CARGO_PKG_VERSION"));
        std::process::exit(0);
    }

    let method: String = noargs::opt("method")
        .short('X')
        .doc("Request method")
        .default("GET")
        .take(&mut args)
        .then(|o| Ok::<_, &str>(o.value().to_string()))
        .map_err(|e| format!("{:?}", e))?;

    let data: Option<String> = noargs::opt("data")
        .short('d')
        .doc("Request body")
        .take(&mut args)
        .present_and_then(|o| Ok::<_, &str>(o.value().to_string()))
        .map_err(|e| format!("{:?}", e))?;

    let max_redirects: usize = noargs::opt("max-redirects")
        .doc("Maximum number of redirects to follow")
        .default("10")
        .take(&mut args)
        .then(|o| o.value().parse())
        .map_err(|e| format!("{:?}", e))?;

    let timeout: u64 = noargs::opt("timeout")
        .doc("Overall timeout in seconds (0 disables)")
        .default("60")
        .take(&mut args)
        .then(|o| o.value().parse())
        .map_err(|e| format!("{:?}", e))?;

    let no_redirect: bool = noargs::flag("no-redirect")
        .doc("Do not follow redirects")
        .take(&mut args)
        .is_present();

    let no_cookies: bool = noargs::flag("no-cookies")
        .doc("Do not carry Set-Cookie across redirects")
        .take(&mut args)
        .is_present();

    let raw: bool = noargs::flag("raw")
        .doc("Keep chunked and compressed bodies as received")
        .take(&mut args)
        .is_present();

    // 位置引数: URL
    let url: String = noargs::arg("<URL>")
        .doc("URL to fetch (e.g., https://example.com/)")
        .take(&mut args)
        .then(|a| Ok::<_, &str>(a.value().to_string()))
        .map_err(|e| format!("{:?}", e))?;

    // 未知の引数があればエラー、ヘルプが返されたら表示
    if let Some(help) = args.finish().map_err(|e| format!("{:?}", e))? {
        print!("{}", help);
        return Ok(());
    }

    let options = ClientOptions::new()
        .follow_redirections(!no_redirect)
        .max_redirections(max_redirects)
        .use_cookies(!no_cookies)
        .dechunk_content(!raw)
        .decode_content(!raw)
        .timeout(Duration::from_secs(timeout));

    let mut request = Request::new(&method, &url)?
        .with_header("User-Agent", concat!("http11_fetch/", env!("CARGO_PKG_VERSION")))?
        .with_header("Accept", "*/*")?;
    if let Some(data) = data {
        request = request
            .with_header("Content-Type", "application/x-www-form-urlencoded")?
            .with_body(data);
    }

    let mut client = Client::with_options(options);
    let response = client.send(request)?;
    if client.redirections() > 0 {
        eprintln!("[followed {} redirect(s)]", client.redirections());
    }
    print_response(&response);

    Ok(())
}

fn print_response(response: &Response) {
    println!(
        "HTTP/{} {} {}",
        response.protocol_version(),
        response.status_code(),
        response.reason_phrase()
    );
    for (name, values) in response.headers().iter() {
        for value in values {
            println!("{}: {}", http11_toolkit::headers::title_case(name), value);
        }
    }
    println!();

    // ボディを表示 (テキストの場合)
    let body = response.body().as_bytes();
    match std::str::from_utf8(body) {
        Ok(text) if text.len() > 1000 => {
            let end = (0..=1000).rev().find(|i| text.is_char_boundary(*i)).unwrap_or(0);
            println!("{}...", &text[..end]);
            println!("\n[Body truncated, {} bytes total]", body.len());
        }
        Ok(text) => println!("{}", text),
        Err(_) => println!("[Binary body, {} bytes]", body.len()),
    }
}
