//! tier フォールバックの束ね役。
//!
//! 呼び出し側（セッション）は多数並行して `analyze` を呼ぶ。各クエリは独立の
//! `id` とタイムアウトを持つため、subprocess・保留テーブルを共有していても
//! 応答の取り違えは起きない。`analyze` はエラーを返さない: どの tier が
//! 失敗してもローカルスコアラが必ず結果を出す。

use std::time::Duration;

use log::warn;

use crate::config::GatewayConfig;
use crate::fallback::{local_score_result, FallbackContext};
use crate::http::RemoteTier;
use crate::subprocess::EngineService;
use crate::wire::{AnalysisQuery, AnalysisResult};

pub struct AnalysisGateway {
    http: Option<RemoteTier>,
    engine: Option<EngineService>,
    max_visits: u32,
}

impl AnalysisGateway {
    pub fn new(config: GatewayConfig) -> Self {
        let query_timeout = Duration::from_secs(config.query_timeout_secs);
        let http = config.http.map(|h| {
            RemoteTier::new(
                h.endpoint,
                h.retries,
                Duration::from_millis(h.retry_delay_ms),
                query_timeout,
            )
        });
        let engine = config
            .engine
            .map(|e| EngineService::new(e, query_timeout));
        Self {
            http,
            engine,
            max_visits: config.max_visits,
        }
    }

    /// 設定済みの既定 visit 数
    pub fn max_visits(&self) -> u32 {
        self.max_visits
    }

    /// 形勢を解析する。必ず結果を返す（呼び出し側にエラーは届かない）。
    ///
    /// tier の優先順は HTTP → subprocess → ローカル。先に成功した tier の
    /// 結果がそのまま採用され、tier 間の突き合わせは行わない。
    pub async fn analyze(
        &self,
        query: &AnalysisQuery,
        fallback: &FallbackContext,
    ) -> AnalysisResult {
        if let Some(http) = &self.http {
            match http.analyze(query).await {
                Ok(result) => return result,
                Err(err) => warn!("remote analysis tier failed for {}: {err}", query.id),
            }
        }

        if let Some(engine) = &self.engine {
            match engine.query(query).await {
                Ok(result) => return result,
                Err(err) => warn!("subprocess analysis tier failed for {}: {err}", query.id),
            }
        }

        local_score_result(&query.id, fallback, query.komi)
    }

    /// subprocess tier を畳む。未設定なら何もしない。
    pub async fn shutdown(&self) {
        if let Some(engine) = &self.engine {
            engine.stop().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbaduk_core::Board;

    #[tokio::test]
    async fn analyze_resolves_locally_when_no_tier_is_configured() {
        let gateway = AnalysisGateway::new(GatewayConfig::default());
        let query = AnalysisQuery::from_moves("g1".into(), &[], 9, 6.5, 50);
        let ctx = FallbackContext {
            board: Board::new(9),
            captures: [0, 0],
        };
        let result = gateway.analyze(&query, &ctx).await;
        assert_eq!(result.id, "g1");
        assert_eq!(result.root_info.score_lead, -6.5);
        assert_eq!(result.ownership.as_ref().map(Vec::len), Some(81));
    }
}
