//! リモート HTTP tier（tier 1）。
//!
//! 設定されたエンドポイントにクエリを POST する。接続失敗・タイムアウトは
//! 固定回数・固定間隔でリトライし、それ以外（非成功ステータス・パース失敗）
//! は即座に次の tier へ落とす。

use std::time::Duration;

use log::warn;

use crate::error::AnalysisError;
use crate::wire::{decode_result, AnalysisQuery, AnalysisResult};

pub struct RemoteTier {
    endpoint: String,
    client: reqwest::Client,
    retries: u32,
    retry_delay: Duration,
    request_timeout: Duration,
}

impl RemoteTier {
    pub fn new(
        endpoint: String,
        retries: u32,
        retry_delay: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
            retries,
            retry_delay,
            request_timeout,
        }
    }

    /// 接続系の失敗のみリトライ対象
    fn is_retryable(err: &AnalysisError) -> bool {
        match err {
            AnalysisError::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }

    pub async fn analyze(&self, query: &AnalysisQuery) -> Result<AnalysisResult, AnalysisError> {
        let mut attempt = 0u32;
        loop {
            match self.post_once(query).await {
                Ok(result) => return Ok(result),
                Err(err) if Self::is_retryable(&err) && attempt < self.retries => {
                    attempt += 1;
                    warn!(
                        "analysis endpoint unreachable (attempt {attempt}/{}): {err}",
                        self.retries
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn post_once(&self, query: &AnalysisQuery) -> Result<AnalysisResult, AnalysisError> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.request_timeout)
            .json(query)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::HttpStatus(status.as_u16()));
        }
        // body の復号は subprocess の行復号と同じ単一の入口を通す
        let body = response.text().await?;
        decode_result(&body)
    }
}
