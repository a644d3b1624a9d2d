//! ゲームモードの戦略ディスパッチ。
//!
//! モードは閉じたタグ付き variant [`GameMode`] で表し、セッション生成時に
//! [`build_rules`] で一度だけ戦略オブジェクトへ解決する。盤面遷移・時計・
//! 採点のコアはモードを知らず、モード差分はすべてこのフックに閉じる。

use rand::Rng;
use rand_xoshiro::rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use rbaduk_core::rules::{apply, ApplyOptions, KoInfo};
use rbaduk_core::{Board, Color, Move, Point};

use crate::error::SessionError;
use crate::session::EndCause;

/// ゲームモード（セッション設定の一部）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GameMode {
    /// 通常対局。二連続パスで採点へ。
    Standard,
    /// 捕獲目標戦。先に `target` 子取った側の即勝ち。
    CaptureRace { target: u32 },
    /// 賽の目戦。出目の数だけ同じ側が連続着手する。
    Dice { seed: u64 },
    /// 隠し石戦。事前配置された石が接触で盤上に現れる。
    HiddenStone { stones: Vec<(Color, Point)> },
    /// ミサイル戦。着手の代わりに相手の石 1 子を除去できる。
    Missile { missiles: u32 },
    /// 一人対局。白は外部 AI が指し、時計は黒側だけ動く。
    SinglePlayer,
}

/// 二連続パス時のモード判断
pub enum PassOutcome {
    /// 採点（解析ゲートウェイ）へ進む
    EnterScoring,
    /// 採点せずその場で決着する
    Decide {
        winner: Option<Color>,
        cause: EndCause,
    },
}

/// モードによる即時決着
pub struct ModeVerdict {
    pub winner: Color,
    pub cause: EndCause,
}

/// モード固有のフック。既定実装は Standard の振る舞い。
pub trait ModeRules: Send {
    /// スナップショットに載せるモード名
    fn label(&self) -> &'static str;

    /// 対局開始時の盤面準備
    fn on_session_start(&mut self, _board: &mut Board) {}

    /// 最初の手番
    fn first_to_move(&mut self) -> Color {
        Color::Black
    }

    /// 着手適用直後のフック。盤面をモード規則で加工でき、勝敗が決まれば
    /// Some を返す。
    fn after_move(
        &mut self,
        _board: &mut Board,
        _mv: &Move,
        _captured: &[Point],
        _captures_total: &[u32; Color::NUM],
    ) -> Option<ModeVerdict> {
        None
    }

    /// 次の手番。既定は交互。
    fn next_to_move(&mut self, just_moved: Color) -> Color {
        just_moved.opponent()
    }

    /// 二連続パスの扱い。既定は採点へ。
    fn on_double_pass(&self, _captures_total: &[u32; Color::NUM]) -> PassOutcome {
        PassOutcome::EnterScoring
    }

    /// この色の時計を動かすか。既定は両者。
    fn clock_runs_for(&self, _color: Color) -> bool {
        true
    }

    /// 採点クエリを着手列の replay として送れるか。盤面を履歴外で編集する
    /// モードは false を返し、現盤面が初期配置として送られる。
    fn scores_from_moves(&self) -> bool {
        true
    }

    /// 着手の代わりに撃つミサイル。対応しないモードでは `UnsupportedAction`。
    fn fire_missile(
        &mut self,
        _board: &mut Board,
        _color: Color,
        _target: Point,
        _ko: Option<&KoInfo>,
        _ply: u32,
    ) -> Result<(), SessionError> {
        Err(SessionError::UnsupportedAction)
    }
}

/// モードを戦略オブジェクトへ解決する（モード分岐の単一の置き場）
pub fn build_rules(mode: &GameMode) -> Box<dyn ModeRules> {
    match mode {
        GameMode::Standard => Box::new(StandardRules),
        GameMode::CaptureRace { target } => Box::new(CaptureRaceRules { target: *target }),
        GameMode::Dice { seed } => Box::new(DiceRules::new(*seed)),
        GameMode::HiddenStone { stones } => Box::new(HiddenStoneRules::new(stones.clone())),
        GameMode::Missile { missiles } => Box::new(MissileRules {
            left: [*missiles; Color::NUM],
        }),
        GameMode::SinglePlayer => Box::new(SinglePlayerRules),
    }
}

struct StandardRules;

impl ModeRules for StandardRules {
    fn label(&self) -> &'static str {
        "standard"
    }
}

/// 一人対局。ルールは Standard と同じで、時計だけ黒専用。
struct SinglePlayerRules;

impl ModeRules for SinglePlayerRules {
    fn label(&self) -> &'static str {
        "single_player"
    }

    fn clock_runs_for(&self, color: Color) -> bool {
        color == Color::Black
    }
}

struct CaptureRaceRules {
    target: u32,
}

impl ModeRules for CaptureRaceRules {
    fn label(&self) -> &'static str {
        "capture_race"
    }

    fn after_move(
        &mut self,
        _board: &mut Board,
        mv: &Move,
        _captured: &[Point],
        captures_total: &[u32; Color::NUM],
    ) -> Option<ModeVerdict> {
        if captures_total[mv.color.index()] >= self.target {
            Some(ModeVerdict {
                winner: mv.color,
                cause: EndCause::CaptureGoal,
            })
        } else {
            None
        }
    }

    /// 地の採点はせず、二連続パス時点の捕獲数で決める
    fn on_double_pass(&self, captures_total: &[u32; Color::NUM]) -> PassOutcome {
        let black = captures_total[Color::Black.index()];
        let white = captures_total[Color::White.index()];
        let winner = match black.cmp(&white) {
            std::cmp::Ordering::Greater => Some(Color::Black),
            std::cmp::Ordering::Less => Some(Color::White),
            std::cmp::Ordering::Equal => None,
        };
        PassOutcome::Decide {
            winner,
            cause: EndCause::CaptureGoal,
        }
    }
}

/// 賽の目戦。手番の切り替わりごとに 1..=3 の出目を引き、その回数だけ同じ側が
/// 連続で着手する。出目列は記録され、同じ seed から完全に再現できる。
struct DiceRules {
    rng: Xoshiro256PlusPlus,
    placements_left: u32,
    rolls: Vec<u8>,
}

impl DiceRules {
    fn new(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            placements_left: 0,
            rolls: Vec::new(),
        }
    }

    fn roll(&mut self) -> u32 {
        let n: u8 = self.rng.random_range(1..=3);
        self.rolls.push(n);
        u32::from(n)
    }
}

impl ModeRules for DiceRules {
    fn label(&self) -> &'static str {
        "dice"
    }

    fn first_to_move(&mut self) -> Color {
        self.placements_left = self.roll();
        Color::Black
    }

    fn next_to_move(&mut self, just_moved: Color) -> Color {
        self.placements_left = self.placements_left.saturating_sub(1);
        if self.placements_left > 0 {
            just_moved
        } else {
            self.placements_left = self.roll();
            just_moved.opponent()
        }
    }
}

struct HiddenStone {
    color: Color,
    point: Point,
    revealed: bool,
}

/// 隠し石戦。隠し石は盤上には無く、このフックの中だけに居る。着手・取りが
/// 隠し石の点かその 4 近傍に触れたとき盤上へ現れ、着点との衝突では双方が
/// 消える。
struct HiddenStoneRules {
    hidden: Vec<HiddenStone>,
}

impl HiddenStoneRules {
    fn new(stones: Vec<(Color, Point)>) -> Self {
        Self {
            hidden: stones
                .into_iter()
                .map(|(color, point)| HiddenStone {
                    color,
                    point,
                    revealed: false,
                })
                .collect(),
        }
    }
}

fn adjacent(a: Point, b: Point) -> bool {
    (a.x - b.x).abs() + (a.y - b.y).abs() == 1
}

impl ModeRules for HiddenStoneRules {
    fn label(&self) -> &'static str {
        "hidden_stone"
    }

    fn scores_from_moves(&self) -> bool {
        false
    }

    fn after_move(
        &mut self,
        board: &mut Board,
        mv: &Move,
        captured: &[Point],
        _captures_total: &[u32; Color::NUM],
    ) -> Option<ModeVerdict> {
        if mv.is_pass() {
            return None;
        }
        for h in self.hidden.iter_mut().filter(|h| !h.revealed) {
            let collision = mv.point == h.point;
            let contact = collision
                || adjacent(mv.point, h.point)
                || captured.iter().any(|c| *c == h.point || adjacent(*c, h.point));
            if !contact {
                continue;
            }
            h.revealed = true;
            if collision || board.get(h.point).is_some() {
                // 衝突: 置かれた（または先に在った）石も隠し石も消える
                board.set(h.point, None);
            } else {
                // 露出は強制配置（自殺許容の speculative 適用）。これにより
                // 露出した石が息のない相手連を取り上げる盤面も正しく遷移する。
                // 取られた石はアゲハマには数えない。
                let reveal = Move::new(h.point, h.color, mv.ply);
                if let Ok(applied) = apply(
                    board,
                    reveal,
                    None,
                    &ApplyOptions {
                        ignore_suicide: true,
                    },
                ) {
                    *board = applied.board;
                }
            }
        }
        None
    }
}

struct MissileRules {
    left: [u32; Color::NUM],
}

impl ModeRules for MissileRules {
    fn label(&self) -> &'static str {
        "missile"
    }

    fn scores_from_moves(&self) -> bool {
        false
    }

    fn fire_missile(
        &mut self,
        board: &mut Board,
        color: Color,
        target: Point,
        ko: Option<&KoInfo>,
        ply: u32,
    ) -> Result<(), SessionError> {
        if self.left[color.index()] == 0 {
            return Err(SessionError::NoMissilesLeft);
        }
        // コウ制限が生きている間はミサイルで迂回できない
        if let Some(k) = ko {
            if ply == k.placed_ply + 1 {
                return Err(SessionError::KoRestriction);
            }
        }
        if board.get(target) != Some(color.opponent()) {
            return Err(SessionError::InvalidMissileTarget);
        }
        self.left[color.index()] -= 1;
        // 取りではなく除去: アゲハマには数えない
        board.set(target, None);
        Ok(())
    }
}
