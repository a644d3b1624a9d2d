//! ゲートウェイ設定。
//!
//! どの tier を試すかは設定の有無で決まる: `http` があれば HTTP tier から、
//! `engine` があれば subprocess tier から。どちらも無ければ常にローカル
//! フォールバックで解決する。設定は依存注入され、モジュールグローバルには
//! 置かない。

use std::path::PathBuf;

use serde::Deserialize;

fn default_query_timeout_secs() -> u64 {
    // 深い解析は分オーダーで待つ
    120
}

fn default_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_max_visits() -> u32 {
    200
}

/// リモート HTTP tier の設定
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// 解析クエリを POST するエンドポイント
    pub endpoint: String,
    /// 接続・タイムアウト失敗時のリトライ回数
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// リトライ間隔
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

/// subprocess tier の設定
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// 解析エンジンのバイナリパス
    pub binary: PathBuf,
    /// モデルファイル（エンジンの `-model` に渡す）
    #[serde(default)]
    pub model: Option<PathBuf>,
    /// エンジン側設定ファイル（`-config` に渡す）
    #[serde(default)]
    pub config: Option<PathBuf>,
    /// 追加の引数
    #[serde(default)]
    pub extra_args: Vec<String>,
}

/// ゲートウェイ全体の設定
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub http: Option<HttpConfig>,
    #[serde(default)]
    pub engine: Option<EngineConfig>,
    /// クエリ単位のタイムアウト（全 tier 共通）
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
    /// 既定の visit 数（呼び出し側がクエリで上書き可能）
    #[serde(default = "default_max_visits")]
    pub max_visits: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            http: None,
            engine: None,
            query_timeout_secs: default_query_timeout_secs(),
            max_visits: default_max_visits(),
        }
    }
}
