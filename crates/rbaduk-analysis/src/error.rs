//! 解析ゲートウェイの内部エラー。
//!
//! いずれも tier 間のフォールバックで吸収され、ゲートウェイの呼び出し側には
//! 到達しない（[`crate::gateway::AnalysisGateway::analyze`] 参照）。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// エンジンプロセスの起動失敗
    #[error("failed to spawn analysis engine: {0}")]
    Spawn(std::io::Error),

    /// エンジンプロセスが終了済み・または応答前に落ちた
    #[error("analysis engine process is not running")]
    ProcessDead,

    /// クエリ単位のタイムアウト（この tier のみ失敗する）
    #[error("analysis query {id} timed out after {timeout_secs}s")]
    Timeout { id: String, timeout_secs: u64 },

    /// エンジンが {"error": ...} 応答を返した
    #[error("analysis engine reported an error: {0}")]
    Engine(String),

    /// 応答 JSON の解釈失敗
    #[error("failed to parse analysis response: {0}")]
    Parse(#[from] serde_json::Error),

    /// HTTP エンドポイントが非成功ステータスを返した（リトライ対象外）
    #[error("analysis endpoint returned status {0}")]
    HttpStatus(u16),

    /// HTTP トランスポートエラー（接続・タイムアウトはリトライ対象）
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// subprocess への書き込み等の I/O エラー
    #[error("io error talking to analysis engine: {0}")]
    Io(#[from] std::io::Error),
}
