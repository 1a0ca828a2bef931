//! サーバー側のリクエスト
//!
//! CGI 形式の環境変数から組み立てたリクエストに、Cookie・クエリ・
//! アップロードファイル・任意の属性を加えたもの。

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cookie::Cookie;
use crate::error::{Error, Result};
use crate::headers::{HttpMessage, IntoHeaderValues, MessageBase, title_case};
use crate::request::{Method, Request};
use crate::uri::{Uri, form_decode};

/// サーバー環境変数
///
/// プロセス環境は [`ServerParams::from_env`] を呼んだときだけ読む。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerParams {
    vars: BTreeMap<String, String>,
}

impl ServerParams {
    /// 変数の組から作成
    ///
    /// ```rust
    /// use http11_toolkit::server::ServerParams;
    ///
    /// let params = ServerParams::from_vars([
    ///     ("REQUEST_METHOD", "POST"),
    ///     ("REQUEST_SCHEME", "http"),
    ///     ("HTTP_HOST", "example.com:8080"),
    ///     ("REQUEST_URI", "/form?a=1"),
    /// ]);
    /// assert_eq!(params.get("REQUEST_METHOD"), Some("POST"));
    /// assert_eq!(params.uri().unwrap().to_string(), "http://example.com:8080/form?a=1");
    /// ```
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// プロセス環境変数から作成
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// 変数を取得
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// すべての変数
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// 変数がないかどうか
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// `REQUEST_METHOD` (なければ GET)
    pub fn method(&self) -> Result<Method> {
        self.get("REQUEST_METHOD")
            .map_or(Ok(Method::Get), str::parse::<Method>)
    }

    /// `REQUEST_SCHEME`、`HTTP_HOST`、`SERVER_PORT`、`REQUEST_URI` から URI を組み立てる
    ///
    /// `HTTP_HOST` のポートは `SERVER_PORT` がない場合に使う。
    pub fn uri(&self) -> Result<Uri> {
        let mut uri = Uri::default();
        if let Some(scheme) = self.get("REQUEST_SCHEME") {
            uri = uri.with_scheme(scheme)?;
        }
        if let Some(host) = self.get("HTTP_HOST") {
            let (name, port) = match host.rsplit_once(':') {
                Some((name, port)) => (name, Some(port)),
                None => (host, None),
            };
            uri = uri.with_host(name)?;
            if let Some(port) = port
                && !self.vars.contains_key("SERVER_PORT")
            {
                uri = uri.with_port(Some(parse_port(port)?))?;
            }
        }
        if let Some(port) = self.get("SERVER_PORT") {
            uri = uri.with_port(Some(parse_port(port)?))?;
        }
        if let Some(request_uri) = self.get("REQUEST_URI") {
            let (path, query) = match request_uri.split_once('?') {
                Some((path, query)) => (path, Some(query)),
                None => (request_uri, None),
            };
            uri = uri.with_path(path)?;
            if let Some(query) = query {
                uri = uri.with_query(query);
            }
        }
        Ok(uri)
    }

    /// `HTTP_*` と `CONTENT_TYPE` / `CONTENT_LENGTH` から得たヘッダー
    pub fn headers(&self) -> Vec<(String, String)> {
        self.vars
            .iter()
            .filter_map(|(name, value)| {
                let header = match name.as_str() {
                    "CONTENT_TYPE" | "CONTENT_LENGTH" => name.as_str(),
                    _ => name.strip_prefix("HTTP_")?,
                };
                Some((title_case(&header.replace('_', "-")), value.clone()))
            })
            .collect()
    }

    /// `SERVER_PROTOCOL` のバージョン部分 (例: `HTTP/1.0` なら `1.0`)
    pub fn protocol_version(&self) -> Option<&str> {
        self.get("SERVER_PROTOCOL")
            .map(|p| p.split_once('/').map_or(p, |(_, version)| version))
    }
}

fn parse_port(port: &str) -> Result<u32> {
    port.trim()
        .parse()
        .map_err(|_| Error::Uri(crate::uri::UriError::InvalidPort))
}

/// アップロードされたファイルのメタデータ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    field: String,
    file_name: String,
    media_type: Option<String>,
    path: PathBuf,
    size: u64,
}

impl UploadedFile {
    /// フォームのフィールド名、クライアント側のファイル名、保存先から作成
    pub fn new(field: &str, file_name: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            field: field.to_string(),
            file_name: file_name.to_string(),
            media_type: None,
            path: path.into(),
            size: 0,
        }
    }

    pub fn with_media_type(mut self, media_type: &str) -> Self {
        self.media_type = Some(media_type.to_string());
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// クエリやフォームの値
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Single(String),
    /// `key[]` 形式で集めた値
    List(Vec<String>),
}

impl QueryValue {
    /// 単一の値
    pub fn as_str(&self) -> Option<&str> {
        match self {
            QueryValue::Single(value) => Some(value),
            QueryValue::List(_) => None,
        }
    }

    /// リストの値 (単一値なら 1 要素)
    pub fn as_slice(&self) -> &[String] {
        match self {
            QueryValue::Single(value) => std::slice::from_ref(value),
            QueryValue::List(values) => values,
        }
    }
}

/// `a=1&b[]=2&b[]=3` 形式の文字列をパース
///
/// キーと値はフォーム形式でデコードする。同じキーは後の値が優先され、
/// `[]` で終わるキーは値を順に集める。
///
/// ```rust
/// use http11_toolkit::server::{QueryValue, parse_query};
///
/// let query = parse_query("a=1&b%5B%5D=2&b%5B%5D=3&c");
/// assert_eq!(query["a"], QueryValue::Single("1".to_string()));
/// assert_eq!(query["b"].as_slice(), ["2", "3"]);
/// assert_eq!(query["c"].as_str(), Some(""));
/// ```
pub fn parse_query(input: &str) -> BTreeMap<String, QueryValue> {
    let mut map = BTreeMap::new();
    for pair in input.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = form_decode(key);
        let value = form_decode(value);
        match key.strip_suffix("[]") {
            Some(list_key) if !list_key.is_empty() => {
                let entry = map
                    .entry(list_key.to_string())
                    .or_insert_with(|| QueryValue::List(Vec::new()));
                match entry {
                    QueryValue::List(values) => values.push(value),
                    single => *single = QueryValue::List(vec![value]),
                }
            }
            _ if key.is_empty() => {}
            _ => {
                map.insert(key, QueryValue::Single(value));
            }
        }
    }
    map
}

/// パース済みのボディ
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedBody {
    /// 構文検証済みの JSON テキスト
    Json(String),
    Form(BTreeMap<String, QueryValue>),
    Text(String),
}

/// サーバー側のリクエスト
///
/// ヘッダーやボディの操作は [`HttpMessage`] を通じて行う。
/// `Cookie` ヘッダーを変更すると Cookie マップ、URI を変更するとクエリマップが
/// 作り直される。
#[derive(Clone, Default)]
pub struct ServerRequest {
    request: Request,
    params: ServerParams,
    files: Vec<UploadedFile>,
    cookies: BTreeMap<String, String>,
    query: BTreeMap<String, QueryValue>,
    parsed_body: Option<ParsedBody>,
    attributes: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl fmt::Debug for ServerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut attributes: Vec<&String> = self.attributes.keys().collect();
        attributes.sort();
        f.debug_struct("ServerRequest")
            .field("request", &self.request)
            .field("params", &self.params)
            .field("files", &self.files)
            .field("cookies", &self.cookies)
            .field("query", &self.query)
            .field("parsed_body", &self.parsed_body)
            .field("attributes", &attributes)
            .finish()
    }
}

impl ServerRequest {
    /// リクエストから作成 (環境変数なし)
    pub fn new(request: Request) -> Self {
        let mut server_request = Self {
            request,
            ..Default::default()
        };
        server_request.extract_cookies();
        server_request.extract_query();
        server_request
    }

    /// 環境変数とアップロードファイルから作成
    ///
    /// ボディは空。必要なら [`HttpMessage::with_body`] で設定する。
    pub fn from_params(params: ServerParams, files: Vec<UploadedFile>) -> Result<Self> {
        let uri = if params.is_empty() {
            None
        } else {
            Some(params.uri()?)
        };
        let mut request = Request::from_parts(params.method()?, uri);
        for (name, value) in params.headers() {
            request = request.with_header(&name, value)?;
        }
        if let Some(version) = params.protocol_version() {
            request = request.with_protocol_version(version);
        }
        tracing::debug!(
            method = %request.method(),
            request_target = %request.request_target(),
            "server request from params"
        );

        let mut server_request = Self::new(request);
        server_request.params = params;
        server_request.files = files;
        Ok(server_request)
    }

    /// プロセス環境変数から作成
    pub fn from_env() -> Result<Self> {
        Self::from_params(ServerParams::from_env(), Vec::new())
    }

    fn extract_cookies(&mut self) {
        self.cookies.clear();
        for line in self.request.header_lines("Cookie") {
            for cookie in Cookie::parse(line) {
                self.cookies
                    .entry(cookie.name().to_string())
                    .or_insert_with(|| cookie.value().to_string());
            }
        }
    }

    fn extract_query(&mut self) {
        self.query = self
            .request
            .uri()
            .map(|uri| parse_query(uri.query()))
            .unwrap_or_default();
    }

    fn with_request(&self, request: Request, header: &str) -> Self {
        let mut server_request = self.clone();
        server_request.request = request;
        if header.eq_ignore_ascii_case("cookie") {
            server_request.extract_cookies();
        }
        server_request
    }

    /// 元のリクエスト
    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn method(&self) -> Method {
        self.request.method()
    }

    pub fn uri(&self) -> Option<&Uri> {
        self.request.uri()
    }

    /// メソッドを変更
    pub fn with_method(&self, method: &str) -> Result<Self> {
        let mut server_request = self.clone();
        server_request.request = self.request.with_method(method)?;
        Ok(server_request)
    }

    /// URI を変更してクエリマップを作り直す
    pub fn with_uri(&self, uri: Uri) -> Self {
        let mut server_request = self.clone();
        server_request.request = self.request.with_uri(uri);
        server_request.extract_query();
        server_request
    }

    /// 環境変数
    pub fn server_params(&self) -> &ServerParams {
        &self.params
    }

    /// アップロードファイル
    pub fn uploaded_files(&self) -> &[UploadedFile] {
        &self.files
    }

    /// Cookie マップ
    pub fn cookies(&self) -> &BTreeMap<String, String> {
        &self.cookies
    }

    /// Cookie の値
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Cookie マップを置き換える (ヘッダーは変更しない)
    pub fn with_cookies(&self, cookies: BTreeMap<String, String>) -> Self {
        Self {
            cookies,
            ..self.clone()
        }
    }

    /// クエリマップ
    pub fn query(&self) -> &BTreeMap<String, QueryValue> {
        &self.query
    }

    /// クエリマップを置き換える (URI は変更しない)
    pub fn with_query(&self, query: BTreeMap<String, QueryValue>) -> Self {
        Self {
            query,
            ..self.clone()
        }
    }

    /// パース済みボディ
    ///
    /// 設定済みでなければ Content-Type に応じてボディをパースする。
    /// - `application/json`: 構文を検証して [`ParsedBody::Json`]
    /// - `text/*`、`application/xml`: [`ParsedBody::Text`]
    /// - それ以外 (既定は `application/x-www-form-urlencoded`): [`ParsedBody::Form`]
    pub fn parsed_body(&self) -> Result<ParsedBody> {
        if let Some(parsed) = &self.parsed_body {
            return Ok(parsed.clone());
        }

        let content_type = self.request.header("Content-Type");
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let text = self.request.body().to_string_lossy();

        match media_type.as_str() {
            "application/json" => {
                nojson::RawJson::parse(&text).map_err(|e| {
                    Error::Parse(format!("unable to parse JSON request body: {}", e))
                })?;
                Ok(ParsedBody::Json(text))
            }
            "application/xml" => Ok(ParsedBody::Text(text)),
            t if t.starts_with("text/") => Ok(ParsedBody::Text(text)),
            _ => Ok(ParsedBody::Form(parse_query(&text))),
        }
    }

    /// JSON ボディを型 T に変換
    pub fn json<T>(&self) -> Result<T>
    where
        for<'text, 'raw> T:
            TryFrom<nojson::RawJsonValue<'text, 'raw>, Error = nojson::JsonParseError>,
    {
        let text = match self.parsed_body()? {
            ParsedBody::Json(text) | ParsedBody::Text(text) => text,
            ParsedBody::Form(_) => self.request.body().to_string_lossy(),
        };
        let raw = nojson::RawJson::parse(&text).map_err(|e| Error::Parse(e.to_string()))?;
        raw.value()
            .try_into()
            .map_err(|e: nojson::JsonParseError| Error::Parse(e.to_string()))
    }

    /// パース済みボディを設定
    pub fn with_parsed_body(&self, parsed_body: ParsedBody) -> Self {
        Self {
            parsed_body: Some(parsed_body),
            ..self.clone()
        }
    }

    /// 属性を取得 (型が一致しなければ `None`)
    pub fn attribute<T: Any>(&self, name: &str) -> Option<&T> {
        self.attributes.get(name)?.downcast_ref()
    }

    /// 属性名の一覧
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// 属性を設定
    pub fn with_attribute<T: Any + Send + Sync>(&self, name: &str, value: T) -> Self {
        let mut server_request = self.clone();
        server_request
            .attributes
            .insert(name.to_string(), Arc::new(value));
        server_request
    }

    /// 属性を削除
    pub fn without_attribute(&self, name: &str) -> Self {
        let mut server_request = self.clone();
        server_request.attributes.remove(name);
        server_request
    }
}

impl HttpMessage for ServerRequest {
    fn base(&self) -> &MessageBase {
        self.request.base()
    }

    fn base_mut(&mut self) -> &mut MessageBase {
        self.request.base_mut()
    }

    fn with_header<V: IntoHeaderValues>(&self, name: &str, values: V) -> Result<Self> {
        let request = self.request.with_header(name, values)?;
        Ok(self.with_request(request, name))
    }

    fn with_added_header<V: IntoHeaderValues>(&self, name: &str, values: V) -> Result<Self> {
        let request = self.request.with_added_header(name, values)?;
        Ok(self.with_request(request, name))
    }

    fn without_header(&self, name: &str) -> Self {
        let request = self.request.without_header(name);
        self.with_request(request, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cgi_params() -> ServerParams {
        ServerParams::from_vars([
            ("REQUEST_METHOD", "post"),
            ("REQUEST_SCHEME", "https"),
            ("HTTP_HOST", "example.com"),
            ("SERVER_PORT", "8443"),
            ("REQUEST_URI", "/submit?x=1&tags[]=a&tags[]=b"),
            ("SERVER_PROTOCOL", "HTTP/1.0"),
            ("HTTP_ACCEPT_LANGUAGE", "en"),
            ("HTTP_COOKIE", "sid=abc%20def; theme=dark; sid=ignored"),
            ("CONTENT_TYPE", "application/x-www-form-urlencoded"),
            ("PATH", "/usr/bin"),
        ])
    }

    #[test]
    fn test_from_params() {
        let request = ServerRequest::from_params(cgi_params(), Vec::new()).unwrap();
        assert_eq!(request.method(), Method::Post);
        assert_eq!(
            request.uri().unwrap().to_string(),
            "https://example.com:8443/submit?x=1&tags[]=a&tags[]=b"
        );
        // Host はクライアントが送った値
        assert_eq!(request.header("Host"), "example.com");
        assert_eq!(request.header("Accept-Language"), "en");
        assert_eq!(
            request.header("Content-Type"),
            "application/x-www-form-urlencoded"
        );
        assert!(!request.has_header("Path"));
        assert_eq!(request.protocol_version(), "1.0");
        assert_eq!(request.server_params().get("PATH"), Some("/usr/bin"));
    }

    #[test]
    fn test_host_port_without_server_port() {
        let params = ServerParams::from_vars([("HTTP_HOST", "localhost:3000")]);
        assert_eq!(params.uri().unwrap().port(), Some(3000));

        let params = ServerParams::from_vars([("SERVER_PORT", "http")]);
        assert!(params.uri().is_err());
    }

    #[test]
    fn test_empty_params() {
        let request = ServerRequest::from_params(ServerParams::default(), Vec::new()).unwrap();
        assert_eq!(request.method(), Method::Get);
        assert!(request.uri().is_none());
        assert!(request.cookies().is_empty());
        assert!(request.query().is_empty());
    }

    #[test]
    fn test_cookies_first_occurrence_wins() {
        let request = ServerRequest::from_params(cgi_params(), Vec::new()).unwrap();
        assert_eq!(request.cookie("sid"), Some("abc def"));
        assert_eq!(request.cookie("theme"), Some("dark"));
        assert_eq!(request.cookies().len(), 2);
    }

    #[test]
    fn test_cookie_header_rederived() {
        let request = ServerRequest::from_params(cgi_params(), Vec::new()).unwrap();
        let changed = request.with_header("cookie", "lang=ja").unwrap();
        assert_eq!(changed.cookie("lang"), Some("ja"));
        assert_eq!(changed.cookie("sid"), None);
        assert_eq!(request.cookie("sid"), Some("abc def"));

        let added = changed.with_added_header("Cookie", "a=1").unwrap();
        assert_eq!(added.cookies().len(), 2);

        let removed = added.without_header("COOKIE");
        assert!(removed.cookies().is_empty());

        // Cookie 以外のヘッダーでは作り直さない
        let custom = request.with_cookies(BTreeMap::new());
        let custom = custom.with_header("X-Other", "1").unwrap();
        assert!(custom.cookies().is_empty());
    }

    #[test]
    fn test_query_rederived_on_uri_change() {
        let request = ServerRequest::from_params(cgi_params(), Vec::new()).unwrap();
        assert_eq!(request.query()["x"].as_str(), Some("1"));
        assert_eq!(request.query()["tags"].as_slice(), ["a", "b"]);

        let moved = request.with_uri(Uri::parse("http://example.com/?y=2").unwrap());
        assert!(!moved.query().contains_key("x"));
        assert_eq!(moved.query()["y"].as_str(), Some("2"));
    }

    #[test]
    fn test_parse_query() {
        let query = parse_query("a=1&a=2&b[]=x&b=y&c[]=z&=skip&d=%7E+e");
        assert_eq!(query["a"].as_str(), Some("2"));
        assert_eq!(query["b"].as_str(), Some("y"));
        assert_eq!(query["c"].as_slice(), ["z"]);
        assert_eq!(query["d"].as_str(), Some("~ e"));
        assert!(!query.contains_key(""));
        assert!(parse_query("").is_empty());
    }

    #[test]
    fn test_parsed_body_form() {
        let request = ServerRequest::from_params(cgi_params(), Vec::new())
            .unwrap()
            .with_body("name=J%C3%B6rg&langs[]=rust&langs[]=c");
        let ParsedBody::Form(form) = request.parsed_body().unwrap() else {
            panic!("expected form body");
        };
        assert_eq!(form["name"].as_str(), Some("Jörg"));
        assert_eq!(form["langs"].as_slice(), ["rust", "c"]);

        // Content-Type がなければフォームとして扱う
        let request = ServerRequest::new(Request::default()).with_body("a=1");
        assert!(matches!(request.parsed_body().unwrap(), ParsedBody::Form(_)));
    }

    #[test]
    fn test_parsed_body_json() {
        let request = ServerRequest::new(Request::default())
            .with_header("Content-Type", "application/json; charset=utf-8")
            .unwrap()
            .with_body(r#"{"id": 7}"#);
        assert_eq!(
            request.parsed_body().unwrap(),
            ParsedBody::Json(r#"{"id": 7}"#.to_string())
        );

        let request = ServerRequest::new(Request::default())
            .with_header("Content-Type", "application/json")
            .unwrap()
            .with_body("{broken");
        assert!(matches!(request.parsed_body(), Err(Error::Parse(_))));

        let numbers = ServerRequest::new(Request::default())
            .with_header("Content-Type", "application/json")
            .unwrap()
            .with_body("[1, 2, 3]");
        let values: Vec<u32> = numbers.json().unwrap();
        assert_eq!(values, [1, 2, 3]);
    }

    #[test]
    fn test_parsed_body_text_and_override() {
        let request = ServerRequest::new(Request::default())
            .with_header("Content-Type", "text/plain")
            .unwrap()
            .with_body("hello");
        assert_eq!(
            request.parsed_body().unwrap(),
            ParsedBody::Text("hello".to_string())
        );

        let injected = request.with_parsed_body(ParsedBody::Text("other".to_string()));
        assert_eq!(
            injected.parsed_body().unwrap(),
            ParsedBody::Text("other".to_string())
        );
    }

    #[test]
    fn test_attributes() {
        let request = ServerRequest::new(Request::default())
            .with_attribute("user_id", 42u64)
            .with_attribute("route", "index".to_string());
        assert_eq!(request.attribute::<u64>("user_id"), Some(&42));
        assert_eq!(request.attribute::<u32>("user_id"), None);
        assert_eq!(
            request.attribute::<String>("route").map(String::as_str),
            Some("index")
        );

        let without = request.without_attribute("user_id");
        assert!(without.attribute::<u64>("user_id").is_none());
        assert!(request.attribute::<u64>("user_id").is_some());

        let mut names: Vec<&str> = request.attribute_names().collect();
        names.sort();
        assert_eq!(names, ["route", "user_id"]);
    }

    #[test]
    fn test_uploaded_files() {
        let file = UploadedFile::new("avatar", "me.png", "/tmp/upload-1")
            .with_media_type("image/png")
            .with_size(2048);
        let request = ServerRequest::from_params(cgi_params(), vec![file.clone()]).unwrap();
        assert_eq!(request.uploaded_files(), [file]);
        assert_eq!(request.uploaded_files()[0].media_type(), Some("image/png"));
        assert_eq!(request.uploaded_files()[0].size(), 2048);
    }
}
