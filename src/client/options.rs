use std::time::Duration;

/// クライアントの動作設定
///
/// ```rust
/// use std::time::Duration;
/// use http11_toolkit::ClientOptions;
///
/// let options = ClientOptions::new()
///     .max_redirections(3)
///     .timeout(Duration::from_secs(5));
/// assert!(options.follow_redirections);
/// assert_eq!(options.max_redirections, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// リダイレクトに追従する (デフォルト: true)
    pub follow_redirections: bool,
    /// リダイレクト回数の上限 (デフォルト: 10)
    pub max_redirections: usize,
    /// Set-Cookie を次のリクエストに引き継ぐ (デフォルト: true)
    pub use_cookies: bool,
    /// chunked 転送エンコーディングを解除する (デフォルト: true)
    pub dechunk_content: bool,
    /// gzip / deflate を展開する (デフォルト: true)
    pub decode_content: bool,
    /// 接続タイムアウト (デフォルト: 30 秒)
    pub connection_timeout: Duration,
    /// リダイレクトを含む全体のタイムアウト (デフォルト: 60 秒、0 で無効)
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            follow_redirections: true,
            max_redirections: 10,
            use_cookies: true,
            dechunk_content: true,
            decode_content: true,
            connection_timeout: Duration::from_secs(30),
            timeout: Duration::from_secs(60),
        }
    }
}

impl ClientOptions {
    /// デフォルト設定を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// リダイレクトに追従するかどうか
    pub fn follow_redirections(mut self, follow: bool) -> Self {
        self.follow_redirections = follow;
        self
    }

    /// リダイレクト回数の上限を設定
    pub fn max_redirections(mut self, max: usize) -> Self {
        self.max_redirections = max;
        self
    }

    /// Cookie を引き継ぐかどうか
    pub fn use_cookies(mut self, use_cookies: bool) -> Self {
        self.use_cookies = use_cookies;
        self
    }

    /// chunked を解除するかどうか
    pub fn dechunk_content(mut self, dechunk: bool) -> Self {
        self.dechunk_content = dechunk;
        self
    }

    /// Content-Encoding を展開するかどうか
    pub fn decode_content(mut self, decode: bool) -> Self {
        self.decode_content = decode;
        self
    }

    /// 接続タイムアウトを設定
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// 全体のタイムアウトを設定
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ClientOptions::default();
        assert!(options.follow_redirections);
        assert_eq!(options.max_redirections, 10);
        assert!(options.use_cookies);
        assert!(options.dechunk_content);
        assert!(options.decode_content);
        assert_eq!(options.connection_timeout, Duration::from_secs(30));
        assert_eq!(options.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_builder() {
        let options = ClientOptions::new()
            .follow_redirections(false)
            .use_cookies(false)
            .dechunk_content(false)
            .decode_content(false)
            .connection_timeout(Duration::from_millis(500));
        assert!(!options.follow_redirections);
        assert!(!options.use_cookies);
        assert!(!options.dechunk_content);
        assert!(!options.decode_content);
        assert_eq!(options.connection_timeout, Duration::from_millis(500));
    }
}
