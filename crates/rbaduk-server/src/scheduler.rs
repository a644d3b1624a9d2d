//! セッションストアと周期スケジューラ。
//!
//! 1 つの周期 tick が全アクティブセッションを走査して時計を進め、deadline
//! 越えを時間切れ終局に昇格する。盤面の適用は着手受信時に同期で行われ、
//! 採点だけが背景タスクに出る。セッションは store の lock を通してしか
//! 触れないため、同一セッションの盤面遷移が並行に走ることはない。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{info, warn};

use rbaduk_analysis::fallback::FallbackContext;
use rbaduk_analysis::wire::{AnalysisQuery, AnalysisResult};
use rbaduk_analysis::AnalysisGateway;
use rbaduk_core::{Color, Point};

use crate::error::SessionError;
use crate::session::{
    GameSession, MoveOutcome, SessionConfig, SessionSnapshot, SessionState,
};

/// ownership がこの閾値を越えて敵方に振れている石を死にとみなす
const DEAD_STONE_THRESHOLD: f32 = 0.6;

/// tick で検出された時間切れの報告
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutReport {
    pub session_id: String,
    pub winner: Option<Color>,
}

/// 全セッションの置き場。トランスポート層はここへの呼び出しだけを持つ。
pub struct SessionStore {
    sessions: Mutex<HashMap<String, GameSession>>,
    gateway: Arc<AnalysisGateway>,
    epoch: Instant,
}

impl SessionStore {
    pub fn new(gateway: AnalysisGateway) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            gateway: Arc::new(gateway),
            epoch: Instant::now(),
        }
    }

    /// store 基準の単調ミリ秒
    pub fn now_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    pub fn create_session(
        &self,
        id: &str,
        config: SessionConfig,
        now_ms: u64,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock().expect("session store poisoned");
        if sessions.contains_key(id) {
            return Err(SessionError::DuplicateSession(id.to_string()));
        }
        info!("session {id} created ({}路)", config.board_size);
        sessions.insert(id.to_string(), GameSession::new(id.to_string(), config, now_ms));
        Ok(())
    }

    /// 着手の提出。採点待ちに入ったら解析を背景タスクへ投げる。
    pub fn submit_move(
        self: &Arc<Self>,
        session_id: &str,
        color: Color,
        point: Point,
        now_ms: u64,
    ) -> Result<MoveOutcome, SessionError> {
        let (outcome, scoring) = {
            let mut sessions = self.sessions.lock().expect("session store poisoned");
            let session = sessions
                .get_mut(session_id)
                .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))?;
            let outcome = session.submit_move(color, point, now_ms)?;
            let scoring = matches!(outcome, MoveOutcome::Scoring)
                .then(|| session.analysis_request(self.gateway.max_visits()));
            (outcome, scoring)
        };
        if let Some((query, ctx)) = scoring {
            self.spawn_scoring(session_id.to_string(), query, ctx);
        }
        Ok(outcome)
    }

    pub fn fire_missile(
        &self,
        session_id: &str,
        color: Color,
        target: Point,
        now_ms: u64,
    ) -> Result<(), SessionError> {
        self.with_session(session_id, |s| s.fire_missile(color, target, now_ms))
    }

    pub fn resign(&self, session_id: &str, color: Color) -> Result<(), SessionError> {
        self.with_session(session_id, |s| s.resign(color))
    }

    pub fn abandon(&self, session_id: &str, color: Color) -> Result<(), SessionError> {
        self.with_session(session_id, |s| s.abandon(color))
    }

    pub fn snapshot(&self, session_id: &str) -> Result<SessionSnapshot, SessionError> {
        let sessions = self.sessions.lock().expect("session store poisoned");
        sessions
            .get(session_id)
            .map(GameSession::snapshot)
            .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))
    }

    /// 終局済みセッションを取り除き、最終スナップショットを返す。
    pub fn remove_session(&self, session_id: &str) -> Result<SessionSnapshot, SessionError> {
        let mut sessions = self.sessions.lock().expect("session store poisoned");
        sessions
            .remove(session_id)
            .map(|s| s.snapshot())
            .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))
    }

    fn with_session<T>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut GameSession) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        let mut sessions = self.sessions.lock().expect("session store poisoned");
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))?;
        f(session)
    }

    /// 全セッションの時計を進め、時間切れを終局に昇格する。
    pub fn tick_all(&self, now_ms: u64) -> Vec<TimeoutReport> {
        let mut sessions = self.sessions.lock().expect("session store poisoned");
        let mut reports = Vec::new();
        for (id, session) in sessions.iter_mut() {
            if session.tick(now_ms).is_none() {
                continue;
            }
            let winner = match session.state() {
                SessionState::Finished { winner, .. } => winner,
                _ => None,
            };
            warn!("session {id}: timeout, winner {winner:?}");
            reports.push(TimeoutReport {
                session_id: id.clone(),
                winner,
            });
        }
        reports
    }

    /// 周期スケジューラ。呼び出し側のタスクで回し続ける（返らない）。
    pub async fn run(&self, period: Duration) {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            self.tick_all(self.now_ms());
        }
    }

    fn spawn_scoring(self: &Arc<Self>, session_id: String, query: AnalysisQuery, ctx: FallbackContext) {
        info!("session {session_id}: scoring pending, dispatching {}", query.id);
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let result = store.gateway.analyze(&query, &ctx).await;
            store.apply_analysis(&session_id, &result);
        });
    }

    /// 解析結果の適用。セッションが別経路で終局・削除済みなら破棄する。
    pub fn apply_analysis(&self, session_id: &str, result: &AnalysisResult) {
        let mut sessions = self.sessions.lock().expect("session store poisoned");
        let Some(session) = sessions.get_mut(session_id) else {
            info!("analysis result {} discarded (session gone)", result.id);
            return;
        };
        match session.apply_score(result, DEAD_STONE_THRESHOLD) {
            Ok(final_score) => info!(
                "session {session_id} scored: B {} / W {}",
                final_score.black, final_score.white
            ),
            Err(_) => info!("analysis result {} discarded (session already ended)", result.id),
        }
    }
}
