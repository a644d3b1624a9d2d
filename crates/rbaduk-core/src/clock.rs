//! 持ち時間の状態機械。
//!
//! プレイヤーごとに `MainTime → Byoyomi(k periods) → TimedOut` と遷移する。
//! フィッシャー方式は `MainTime` のみで、着手完了ごとに固定加算が入る。
//!
//! 時計は呼び出し側から渡される単調ミリ秒でのみ駆動され、自分では時刻を
//! 読まない。経過時間が預金から引かれるのは deadline チェック（[`SessionClock::tick`]）
//! と手番終了（[`SessionClock::commit_move`]）の時だけで、バックグラウンドでの
//! 連続減算は行わない。

use serde::{Deserialize, Serialize};

use crate::types::Color;

/// 超過時間の方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Overtime {
    /// 秒読み。メイン時間消費後、1 回 `period_ms` のカウントダウンを
    /// `periods` 回まで消費できる。
    Byoyomi { period_ms: u64, periods: u32 },
    /// フィッシャー加算。着手完了ごとに `increment_ms` を加算。秒読みには
    /// 入らない。
    Fischer { increment_ms: u64 },
    /// 切れ負け
    SuddenDeath,
}

/// 片側分の持ち時間設定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSettings {
    pub main_ms: u64,
    pub overtime: Overtime,
}

/// 片側の時計の局面
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Main,
    Byoyomi { periods_left: u32 },
    TimedOut,
}

#[derive(Debug, Clone, Copy)]
struct PlayerClock {
    settings: TimeSettings,
    main_left_ms: u64,
    phase: Phase,
}

impl PlayerClock {
    fn new(settings: TimeSettings) -> Self {
        Self {
            settings,
            main_left_ms: settings.main_ms,
            phase: Phase::Main,
        }
    }
}

/// 時間切れ。呼び出し側でセッション終了（相手の勝ち）に昇格される。
/// 黙って無視してはならない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutEvent {
    pub loser: Color,
}

/// スナップショット用の残り時間表示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSnapshot {
    pub main_left_ms: u64,
    /// 残り秒読み回数。秒読み未突入なら設定値、秒読みのない方式では 0。
    pub periods_left: u32,
    pub timed_out: bool,
}

/// 手番中の計時状態。`anchor_ms` はメイン時間の消費起点、または秒読み
/// カウントダウンの起点で、フェーズ遷移のたびに前進する。
#[derive(Debug, Clone, Copy)]
struct ActiveTurn {
    side: Color,
    anchor_ms: u64,
}

/// セッション 1 つ分の対局時計。
///
/// 不変条件: 生きている deadline は常に高々 1 つ（手番側のみ）。手番でない
/// 側の残り時間は凍結される。保持する時間値は全て 0 以上にクランプされる。
#[derive(Debug, Clone)]
pub struct SessionClock {
    clocks: [PlayerClock; Color::NUM],
    active: Option<ActiveTurn>,
}

impl SessionClock {
    /// 両者同じ設定で作る
    pub fn new(settings: TimeSettings) -> Self {
        Self::with_settings(settings, settings)
    }

    /// 先後で異なる設定（ハンデ戦など）
    pub fn with_settings(black: TimeSettings, white: TimeSettings) -> Self {
        Self {
            clocks: [PlayerClock::new(black), PlayerClock::new(white)],
            active: None,
        }
    }

    /// 手番を開始し、その側のカウントダウンを生かす。
    pub fn start_turn(&mut self, side: Color, now_ms: u64) {
        debug_assert!(self.active.is_none(), "previous turn not committed");
        self.active = Some(ActiveTurn {
            side,
            anchor_ms: now_ms,
        });
    }

    /// 現在手番の側。手番が開いていなければ None。
    pub fn active_side(&self) -> Option<Color> {
        self.active.map(|t| t.side)
    }

    /// 次に deadline が来る時刻。手番が開いていなければ None。
    pub fn deadline_ms(&self) -> Option<u64> {
        let turn = self.active?;
        let clock = &self.clocks[turn.side.index()];
        match clock.phase {
            Phase::Main => Some(turn.anchor_ms.saturating_add(clock.main_left_ms)),
            Phase::Byoyomi { .. } => match clock.settings.overtime {
                Overtime::Byoyomi { period_ms, .. } => {
                    Some(turn.anchor_ms.saturating_add(period_ms))
                }
                // Byoyomi フェーズは Byoyomi 方式でしか到達しない
                _ => Some(turn.anchor_ms),
            },
            Phase::TimedOut => Some(turn.anchor_ms),
        }
    }

    /// deadline 越えを検出し、フェーズを進める。
    ///
    /// - メイン時間初回消費: period を消費せず秒読みへ（猶予遷移）
    /// - 以後のカウントダウン満了: period を 1 つ消費してリセット
    /// - period 残 0 でのカウントダウン満了: `TimedOut`（終端）
    ///
    /// 長い空白で複数の period を跨いだ場合も 1 回の呼び出しで全て進める。
    pub fn tick(&mut self, now_ms: u64) -> Option<TimeoutEvent> {
        let mut turn = self.active?;
        let mut clock = self.clocks[turn.side.index()];

        let event = loop {
            match clock.phase {
                Phase::TimedOut => break Some(TimeoutEvent { loser: turn.side }),
                Phase::Main => {
                    let deadline = turn.anchor_ms.saturating_add(clock.main_left_ms);
                    if now_ms < deadline {
                        break None;
                    }
                    clock.main_left_ms = 0;
                    match clock.settings.overtime {
                        Overtime::Byoyomi { periods, .. } => {
                            // 猶予遷移: period は減らさず、新しいカウントダウンを張る
                            clock.phase = Phase::Byoyomi {
                                periods_left: periods,
                            };
                            turn.anchor_ms = deadline;
                        }
                        Overtime::Fischer { .. } | Overtime::SuddenDeath => {
                            clock.phase = Phase::TimedOut;
                        }
                    }
                }
                Phase::Byoyomi { periods_left } => {
                    let period_ms = match clock.settings.overtime {
                        Overtime::Byoyomi { period_ms, .. } => period_ms,
                        _ => unreachable!("byoyomi phase without byoyomi overtime"),
                    };
                    let deadline = turn.anchor_ms.saturating_add(period_ms);
                    if now_ms < deadline {
                        break None;
                    }
                    if periods_left == 0 {
                        clock.phase = Phase::TimedOut;
                    } else {
                        clock.phase = Phase::Byoyomi {
                            periods_left: periods_left - 1,
                        };
                        turn.anchor_ms = deadline;
                    }
                }
            }
        };

        self.clocks[turn.side.index()] = clock;
        self.active = Some(turn);
        event
    }

    /// 手番終了。経過時間を確定し、時計を止める。
    ///
    /// メイン時間中なら経過分を減算（0 にクランプ）。秒読み中は使い切り式で、
    /// 着手した時点でカウントダウンは放棄され、次にこの側の手番が来たとき
    /// まるごと 1 period からやり直しになる。フィッシャー方式では減算後に
    /// 加算が入る。
    ///
    /// deadline をすでに越えていた場合は `Err(TimeoutEvent)` を返し、時間は
    /// 確定しない。
    pub fn commit_move(&mut self, now_ms: u64) -> Result<(), TimeoutEvent> {
        if let Some(ev) = self.tick(now_ms) {
            return Err(ev);
        }
        let Some(turn) = self.active.take() else {
            debug_assert!(false, "commit_move without active turn");
            return Ok(());
        };
        let clock = &mut self.clocks[turn.side.index()];
        match clock.phase {
            Phase::Main => {
                let elapsed = now_ms.saturating_sub(turn.anchor_ms);
                clock.main_left_ms = clock.main_left_ms.saturating_sub(elapsed);
                if let Overtime::Fischer { increment_ms } = clock.settings.overtime {
                    // 加算はこの手を打った側にのみ、着手直後に入る
                    clock.main_left_ms = clock.main_left_ms.saturating_add(increment_ms);
                }
            }
            // 秒読みは使い切り式。途中までのカウントダウンは持ち越さない。
            Phase::Byoyomi { .. } => {}
            Phase::TimedOut => unreachable!("tick above reports timeouts"),
        }
        Ok(())
    }

    /// 残り時間の読み出し（凍結値）。手番側の未確定経過分は含まない。
    pub fn snapshot(&self, side: Color) -> ClockSnapshot {
        let clock = &self.clocks[side.index()];
        let periods_left = match clock.phase {
            Phase::Main => match clock.settings.overtime {
                Overtime::Byoyomi { periods, .. } => periods,
                _ => 0,
            },
            Phase::Byoyomi { periods_left } => periods_left,
            Phase::TimedOut => 0,
        };
        ClockSnapshot {
            main_left_ms: clock.main_left_ms,
            periods_left,
            timed_out: clock.phase == Phase::TimedOut,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BYOYOMI_30X3: TimeSettings = TimeSettings {
        main_ms: 60_000,
        overtime: Overtime::Byoyomi {
            period_ms: 30_000,
            periods: 3,
        },
    };

    #[test]
    fn main_time_is_deducted_on_commit_only() {
        let mut clock = SessionClock::new(BYOYOMI_30X3);
        clock.start_turn(Color::Black, 0);
        // 手番中の tick では預金は減らない
        assert!(clock.tick(10_000).is_none());
        assert_eq!(clock.snapshot(Color::Black).main_left_ms, 60_000);
        clock.commit_move(10_000).unwrap();
        assert_eq!(clock.snapshot(Color::Black).main_left_ms, 50_000);
        // 相手の時計は凍結されたまま
        assert_eq!(clock.snapshot(Color::White).main_left_ms, 60_000);
    }

    #[test]
    fn overrun_enters_byoyomi_without_consuming_a_period() {
        // 65 秒かかった手: メインは 0 にクランプ、period は 3 のまま（猶予遷移）
        let mut clock = SessionClock::new(BYOYOMI_30X3);
        clock.start_turn(Color::Black, 0);
        clock.commit_move(65_000).unwrap();
        let snap = clock.snapshot(Color::Black);
        assert_eq!(snap.main_left_ms, 0);
        assert_eq!(snap.periods_left, 3);
        assert!(!snap.timed_out);
    }

    #[test]
    fn next_overrun_consumes_one_period() {
        let mut clock = SessionClock::new(BYOYOMI_30X3);
        clock.start_turn(Color::Black, 0);
        clock.commit_move(65_000).unwrap();

        // 次の手番: 30 秒のカウントダウンを 1 回超過 → period 3 → 2
        clock.start_turn(Color::Black, 100_000);
        assert!(clock.tick(135_000).is_none());
        clock.commit_move(136_000).unwrap();
        assert_eq!(clock.snapshot(Color::Black).periods_left, 2);
    }

    #[test]
    fn byoyomi_resets_in_full_when_a_move_is_made() {
        let mut clock = SessionClock::new(BYOYOMI_30X3);
        clock.start_turn(Color::Black, 0);
        clock.commit_move(65_000).unwrap();

        // 29 秒使って着手 → 次の手番でもカウントダウンは丸ごと 30 秒
        clock.start_turn(Color::Black, 100_000);
        clock.commit_move(129_000).unwrap();
        assert_eq!(clock.snapshot(Color::Black).periods_left, 3);

        clock.start_turn(Color::Black, 200_000);
        assert_eq!(clock.deadline_ms(), Some(230_000));
    }

    #[test]
    fn countdown_expiry_with_no_periods_left_times_out() {
        let settings = TimeSettings {
            main_ms: 1_000,
            overtime: Overtime::Byoyomi {
                period_ms: 500,
                periods: 1,
            },
        };
        let mut clock = SessionClock::new(settings);
        clock.start_turn(Color::White, 0);
        // メイン 1000ms → 猶予 500ms → 消費 (1→0) 500ms → 満了で時間切れ
        assert!(clock.tick(1_999).is_none());
        let ev = clock.tick(2_000).unwrap();
        assert_eq!(ev.loser, Color::White);
        assert!(clock.snapshot(Color::White).timed_out);
        // 以後の commit は Err を返し続ける
        assert!(clock.commit_move(2_100).is_err());
    }

    #[test]
    fn long_gap_crosses_multiple_periods_in_one_tick() {
        let mut clock = SessionClock::new(BYOYOMI_30X3);
        clock.start_turn(Color::Black, 0);
        // 60 + 30(猶予) + 30×3(消費) = 180 秒で時間切れ
        assert!(clock.tick(179_999).is_none());
        assert_eq!(clock.snapshot(Color::Black).periods_left, 0);
        let ev = clock.tick(180_000).unwrap();
        assert_eq!(ev.loser, Color::Black);
    }

    #[test]
    fn fischer_increment_applies_only_to_the_mover() {
        let settings = TimeSettings {
            main_ms: 10_000,
            overtime: Overtime::Fischer { increment_ms: 2_000 },
        };
        let mut clock = SessionClock::new(settings);
        clock.start_turn(Color::Black, 0);
        clock.commit_move(3_000).unwrap();
        assert_eq!(clock.snapshot(Color::Black).main_left_ms, 9_000);
        assert_eq!(clock.snapshot(Color::White).main_left_ms, 10_000);
    }

    #[test]
    fn fischer_has_no_byoyomi_and_times_out_on_exhaustion() {
        let settings = TimeSettings {
            main_ms: 1_000,
            overtime: Overtime::Fischer { increment_ms: 500 },
        };
        let mut clock = SessionClock::new(settings);
        clock.start_turn(Color::Black, 0);
        let ev = clock.tick(1_000).unwrap();
        assert_eq!(ev.loser, Color::Black);
    }

    #[test]
    fn sudden_death_times_out_at_main_exhaustion() {
        let settings = TimeSettings {
            main_ms: 5_000,
            overtime: Overtime::SuddenDeath,
        };
        let mut clock = SessionClock::new(settings);
        clock.start_turn(Color::White, 100);
        assert!(clock.tick(5_099).is_none());
        assert_eq!(
            clock.tick(5_100),
            Some(TimeoutEvent {
                loser: Color::White
            })
        );
    }

    #[test]
    fn totals_are_monotonic_without_increment() {
        let mut clock = SessionClock::new(BYOYOMI_30X3);
        let mut prev = clock.snapshot(Color::Black).main_left_ms;
        let mut now = 0;
        for _ in 0..5 {
            clock.start_turn(Color::Black, now);
            now += 7_000;
            clock.commit_move(now).unwrap();
            let cur = clock.snapshot(Color::Black).main_left_ms;
            assert!(cur <= prev);
            prev = cur;
            now += 1_000;
        }
    }

    #[test]
    fn deadline_follows_active_phase() {
        let mut clock = SessionClock::new(BYOYOMI_30X3);
        assert_eq!(clock.deadline_ms(), None);
        clock.start_turn(Color::Black, 1_000);
        assert_eq!(clock.deadline_ms(), Some(61_000));
        // メイン消費後は秒読みカウントダウンの deadline に切り替わる
        assert!(clock.tick(61_000).is_none());
        assert_eq!(clock.deadline_ms(), Some(91_000));
    }
}
