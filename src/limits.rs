/// トランスポートの制限設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportLimits {
    /// 最大ヘッダー行長 (デフォルト: 8KB)
    ///
    /// ステータス行とチャンクサイズ行にも適用する。
    pub max_line_size: usize,
    /// 最大ヘッダー数 (デフォルト: 100)
    pub max_headers_count: usize,
    /// 最大ボディサイズ (デフォルト: 10MB)
    ///
    /// 展開後のボディにも適用する。
    pub max_body_size: usize,
}

impl Default for TransportLimits {
    fn default() -> Self {
        Self {
            max_line_size: 8 * 1024, // 8KB
            max_headers_count: 100,
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

impl TransportLimits {
    /// 制限なしの設定を作成
    pub fn unlimited() -> Self {
        Self {
            max_line_size: usize::MAX,
            max_headers_count: usize::MAX,
            max_body_size: usize::MAX,
        }
    }
}
