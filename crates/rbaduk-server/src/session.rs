//! 対局セッション。
//!
//! 1 セッション = 1 盤面 + 1 対局時計 + モード戦略。着手はセッション内で
//! 厳密に直列化され、手番を持つ側の提出だけが盤面に到達する。ルール上の
//! 却下は [`MoveOutcome::Rejected`] としてセッションを壊さずに返る。

use chrono::{DateTime, Utc};
use serde::Serialize;

use rbaduk_analysis::fallback::FallbackContext;
use rbaduk_analysis::wire::{dead_stones, point_to_wire, AnalysisQuery, AnalysisResult};
use rbaduk_core::clock::{ClockSnapshot, SessionClock, TimeSettings};
use rbaduk_core::rules::{apply, ApplyOptions, KoInfo, MoveRejection};
use rbaduk_core::scoring::{score, FinalScore};
use rbaduk_core::{Board, Color, Move, Point};

use crate::error::SessionError;
use crate::modes::{build_rules, GameMode, ModeRules, PassOutcome};

/// 終局理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndCause {
    /// 持ち時間切れ
    Timeout,
    /// 投了
    Resignation,
    /// 採点による決着
    Score,
    /// 捕獲目標の達成（または捕獲数比較）
    CaptureGoal,
    /// 接続断などによる放棄
    Abandoned,
}

/// セッションの生存状態
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionState {
    /// 着手待ち
    AwaitingMove,
    /// 終局条件は立ったが採点結果待ち
    ScoringPending,
    /// 終局済み
    Finished {
        winner: Option<Color>,
        cause: EndCause,
    },
}

/// セッション設定
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub board_size: u8,
    pub komi: f64,
    pub time: TimeSettings,
    pub mode: GameMode,
}

/// 着手提出の結果。呼び出し側の I/O 層が ok/理由 のペアとして中継する。
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// 適用された
    Played { captured: Vec<Point> },
    /// ルール違反で却下（セッションは続行、盤面不変）
    Rejected(MoveRejection),
    /// 二連続パス等で採点待ちに入った
    Scoring,
    /// この提出でセッションが終局した
    Ended {
        winner: Option<Color>,
        cause: EndCause,
    },
}

/// 下流コラボレータ（報酬・戦績）へ渡すスナップショット
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub mode: String,
    pub board_size: u8,
    pub board: Vec<Vec<Option<Color>>>,
    pub moves: Vec<Move>,
    pub captures: [u32; Color::NUM],
    pub clocks: [ClockSnapshot; Color::NUM],
    pub to_move: Color,
    pub phase: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_cause: Option<EndCause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<FinalScore>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

pub struct GameSession {
    id: String,
    config: SessionConfig,
    board: Board,
    history: Vec<Move>,
    captures: [u32; Color::NUM],
    ko: Option<KoInfo>,
    clock: SessionClock,
    state: SessionState,
    to_move: Color,
    /// 手数カウンタ。ミサイル等、履歴に残らないアクションでも進む。
    ply: u32,
    consecutive_passes: u32,
    rules: Box<dyn ModeRules>,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    result: Option<FinalScore>,
}

impl GameSession {
    pub fn new(id: String, config: SessionConfig, now_ms: u64) -> Self {
        let mut rules = build_rules(&config.mode);
        let mut board = Board::new(config.board_size);
        rules.on_session_start(&mut board);
        let to_move = rules.first_to_move();
        let mut clock = SessionClock::new(config.time);
        if rules.clock_runs_for(to_move) {
            clock.start_turn(to_move, now_ms);
        }
        Self {
            id,
            config,
            board,
            history: Vec::new(),
            captures: [0; Color::NUM],
            ko: None,
            clock,
            state: SessionState::AwaitingMove,
            to_move,
            ply: 0,
            consecutive_passes: 0,
            rules,
            started_at: Utc::now(),
            ended_at: None,
            result: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn to_move(&self) -> Color {
        self.to_move
    }

    pub fn captures(&self) -> [u32; Color::NUM] {
        self.captures
    }

    fn ensure_awaiting(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::AwaitingMove => Ok(()),
            SessionState::ScoringPending => Err(SessionError::ScoringPending),
            SessionState::Finished { .. } => Err(SessionError::SessionEnded),
        }
    }

    fn finish(&mut self, winner: Option<Color>, cause: EndCause) {
        self.state = SessionState::Finished { winner, cause };
        self.ended_at = Some(Utc::now());
    }

    /// 着手を提出する。手番を持つ側しか呼べない。
    ///
    /// ルール違反は `Rejected` で返り、時計は止まらない（同じ手番のまま
    /// 打ち直しになる）。
    pub fn submit_move(
        &mut self,
        color: Color,
        point: Point,
        now_ms: u64,
    ) -> Result<MoveOutcome, SessionError> {
        self.ensure_awaiting()?;
        if color != self.to_move {
            return Err(SessionError::NotYourTurn(color));
        }

        let mv = Move::new(point, color, self.ply);
        let applied = match apply(&self.board, mv, self.ko, &ApplyOptions::default()) {
            Ok(applied) => applied,
            Err(rejection) => return Ok(MoveOutcome::Rejected(rejection)),
        };

        // 時計の確定。deadline をすでに越えていたらこの手は成立しない。
        if self.rules.clock_runs_for(color) {
            if let Err(timeout) = self.clock.commit_move(now_ms) {
                let winner = timeout.loser.opponent();
                self.finish(Some(winner), EndCause::Timeout);
                return Ok(MoveOutcome::Ended {
                    winner: Some(winner),
                    cause: EndCause::Timeout,
                });
            }
        }

        self.board = applied.board;
        self.ko = applied.ko;
        self.captures[color.index()] += applied.captured.len() as u32;
        self.history.push(mv);
        self.ply += 1;
        if mv.is_pass() {
            self.consecutive_passes += 1;
        } else {
            self.consecutive_passes = 0;
        }

        if let Some(verdict) = self.rules.after_move(
            &mut self.board,
            &mv,
            &applied.captured,
            &self.captures,
        ) {
            self.finish(Some(verdict.winner), verdict.cause);
            return Ok(MoveOutcome::Ended {
                winner: Some(verdict.winner),
                cause: verdict.cause,
            });
        }

        if self.consecutive_passes >= 2 {
            match self.rules.on_double_pass(&self.captures) {
                PassOutcome::EnterScoring => {
                    self.state = SessionState::ScoringPending;
                    return Ok(MoveOutcome::Scoring);
                }
                PassOutcome::Decide { winner, cause } => {
                    self.finish(winner, cause);
                    return Ok(MoveOutcome::Ended { winner, cause });
                }
            }
        }

        self.to_move = self.rules.next_to_move(color);
        if self.rules.clock_runs_for(self.to_move) {
            self.clock.start_turn(self.to_move, now_ms);
        }
        Ok(MoveOutcome::Played {
            captured: applied.captured,
        })
    }

    /// 着手の代わりにミサイルを撃つ（対応モードのみ）。
    pub fn fire_missile(
        &mut self,
        color: Color,
        target: Point,
        now_ms: u64,
    ) -> Result<(), SessionError> {
        self.ensure_awaiting()?;
        if color != self.to_move {
            return Err(SessionError::NotYourTurn(color));
        }
        self.rules
            .fire_missile(&mut self.board, color, target, self.ko.as_ref(), self.ply)?;

        if self.rules.clock_runs_for(color) {
            if let Err(timeout) = self.clock.commit_move(now_ms) {
                let winner = timeout.loser.opponent();
                self.finish(Some(winner), EndCause::Timeout);
                return Err(SessionError::SessionEnded);
            }
        }
        self.ply += 1;
        self.consecutive_passes = 0;
        self.to_move = self.rules.next_to_move(color);
        if self.rules.clock_runs_for(self.to_move) {
            self.clock.start_turn(self.to_move, now_ms);
        }
        Ok(())
    }

    /// 投了。採点待ち中でも有効（遅延して届く解析結果は破棄される）。
    pub fn resign(&mut self, color: Color) -> Result<(), SessionError> {
        if matches!(self.state, SessionState::Finished { .. }) {
            return Err(SessionError::SessionEnded);
        }
        self.finish(Some(color.opponent()), EndCause::Resignation);
        Ok(())
    }

    /// 接続断などによる放棄。
    pub fn abandon(&mut self, color: Color) -> Result<(), SessionError> {
        if matches!(self.state, SessionState::Finished { .. }) {
            return Err(SessionError::SessionEnded);
        }
        self.finish(Some(color.opponent()), EndCause::Abandoned);
        Ok(())
    }

    /// スケジューラ tick。deadline 越えを時間切れ終局に昇格する。
    ///
    /// 他の終局条件が先に立っている（採点待ち・終局済み）セッションでは
    /// 何もしない。
    pub fn tick(&mut self, now_ms: u64) -> Option<EndCause> {
        if self.state != SessionState::AwaitingMove {
            return None;
        }
        let timeout = self.clock.tick(now_ms)?;
        let winner = timeout.loser.opponent();
        self.finish(Some(winner), EndCause::Timeout);
        Some(EndCause::Timeout)
    }

    /// 採点用のクエリと、最終 tier 用の盤面コンテキストを組み立てる。
    ///
    /// 盤面を履歴の replay で再現できないモード（隠し石・ミサイル）では
    /// 着手列の代わりに現盤面を `initialStones` として送る。
    pub fn analysis_request(&self, max_visits: u32) -> (AnalysisQuery, FallbackContext) {
        let query_id = format!("{}-{}", self.id, self.ply);
        let mut query = AnalysisQuery::from_moves(
            query_id,
            &self.history,
            self.config.board_size,
            self.config.komi,
            max_visits,
        );
        if !self.rules.scores_from_moves() {
            query.moves.clear();
            query.initial_stones = self
                .board
                .points()
                .filter_map(|p| {
                    self.board.get(p).map(|c| {
                        (
                            c.wire_label().to_string(),
                            point_to_wire(p, self.config.board_size),
                        )
                    })
                })
                .collect();
        }
        let ctx = FallbackContext {
            board: self.board.clone(),
            captures: self.captures,
        };
        (query, ctx)
    }

    /// 解析結果を受けて採点を確定する。
    ///
    /// 採点待ち以外の状態で届いた結果はエラーになり、呼び出し側で破棄される
    /// （セッションが別経路で終局した後に解析が返ってきた場合）。
    pub fn apply_score(
        &mut self,
        result: &AnalysisResult,
        dead_threshold: f32,
    ) -> Result<FinalScore, SessionError> {
        if self.state != SessionState::ScoringPending {
            return Err(SessionError::SessionEnded);
        }
        let dead = result
            .ownership
            .as_deref()
            .map(|o| dead_stones(&self.board, o, dead_threshold))
            .unwrap_or_default();
        let final_score = score(&self.board, self.captures, &dead, self.config.komi);
        self.result = Some(final_score);
        self.finish(final_score.winner, EndCause::Score);
        Ok(final_score)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let (phase, winner, end_cause) = match self.state {
            SessionState::AwaitingMove => ("awaiting_move", None, None),
            SessionState::ScoringPending => ("scoring_pending", None, None),
            SessionState::Finished { winner, cause } => ("finished", winner, Some(cause)),
        };
        SessionSnapshot {
            id: self.id.clone(),
            mode: self.rules.label().to_string(),
            board_size: self.config.board_size,
            board: self.board.grid(),
            moves: self.history.clone(),
            captures: self.captures,
            clocks: [
                self.clock.snapshot(Color::Black),
                self.clock.snapshot(Color::White),
            ],
            to_move: self.to_move,
            phase,
            winner,
            end_cause,
            score: self.result,
            started_at: self.started_at,
            ended_at: self.ended_at,
        }
    }
}
