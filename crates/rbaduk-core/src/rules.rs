//! 着手の適用。合法判定・取り・コウ。
//!
//! [`apply`] は純粋関数で、入力の盤面を変更せず新しい盤面を返す。却下は
//! すべて局所的・非致命的で、呼び出し側には [`MoveRejection`] が値として
//! 返る（panic も unwind もしない）。

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::Board;
use crate::types::{Move, Point};

/// コウによる着手禁止。直後の 1 手（`placed_ply + 1`）だけを制限する。
///
/// 1 手進めば自然に無効になるため、呼び出し側が明示的にクリアする必要はない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KoInfo {
    /// 再取りが禁止される点
    pub point: Point,
    /// コウを発生させた着手の手数
    pub placed_ply: u32,
}

impl KoInfo {
    /// この手に対してコウ制限が効いているか
    #[inline]
    pub fn forbids(&self, mv: &Move) -> bool {
        mv.ply == self.placed_ply + 1 && mv.point == self.point
    }
}

/// 着手適用のオプション
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    /// 自殺手を許可する。AI の盤面セットアップや特殊モードの強制配置など、
    /// what-if 的な配置にのみ使い、通常の対局手には使わない。
    pub ignore_suicide: bool,
}

/// 着手の却下理由。盤面・コウ状態は変更されない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveRejection {
    #[error("target point is outside the board")]
    OutOfBounds,
    #[error("target point is already occupied")]
    Occupied,
    #[error("ko rule forbids immediate recapture")]
    Ko,
    #[error("move would leave its own group without liberties")]
    Suicide,
}

/// 着手適用の結果
#[derive(Debug, Clone)]
pub struct Applied {
    /// 適用後の盤面
    pub board: Board,
    /// この手で取り上げられた石
    pub captured: Vec<Point>,
    /// 新しいコウ状態（コウが発生しなければ None）
    pub ko: Option<KoInfo>,
}

/// 1手を盤面に適用する。
///
/// 1. パスは盤面に触れず常に成功する。
/// 2. 着点が埋まっていれば `Occupied`。
/// 3. 着点が有効なコウ点なら `Ko`。
/// 4. 仮置き後、隣接する相手連の呼吸点を走査し、0 になった連を取り上げる。
/// 5. 取りの後に自連の呼吸点を数え、0 かつ `ignore_suicide` が偽なら
///    `Suicide`。
/// 6. ちょうど 1 子の取りで、置いた石が単独かつ呼吸点 1 のとき単純コウが
///    成立し、次の 1 手だけその点の再取りを禁止する（positional superko は
///    扱わない）。
pub fn apply(
    board: &Board,
    mv: Move,
    ko: Option<KoInfo>,
    options: &ApplyOptions,
) -> Result<Applied, MoveRejection> {
    if mv.is_pass() {
        return Ok(Applied {
            board: board.clone(),
            captured: Vec::new(),
            ko: None,
        });
    }
    if !board.in_bounds(mv.point) {
        return Err(MoveRejection::OutOfBounds);
    }
    if board.get(mv.point).is_some() {
        return Err(MoveRejection::Occupied);
    }
    if let Some(k) = ko {
        if k.forbids(&mv) {
            return Err(MoveRejection::Ko);
        }
    }

    let mut next = board.clone();
    next.set(mv.point, Some(mv.color));

    // 取りは自殺判定より先に評価する
    let mut captured = Vec::new();
    for n in next.neighbors(mv.point) {
        if next.get(n) != Some(mv.color.opponent()) {
            continue;
        }
        // 取り上げ済みの連は get が None になり再走査されない
        if let Some(group) = next.group(n) {
            if group.liberties == 0 {
                for p in &group.stones {
                    next.set(*p, None);
                }
                captured.extend(group.stones);
            }
        }
    }

    let own = next
        .group(mv.point)
        .expect("placed stone must form a group");
    if own.liberties == 0 && !options.ignore_suicide {
        return Err(MoveRejection::Suicide);
    }

    let new_ko = if captured.len() == 1 && own.stones.len() == 1 && own.liberties == 1 {
        Some(KoInfo {
            point: captured[0],
            placed_ply: mv.ply,
        })
    } else {
        None
    };

    Ok(Applied {
        board: next,
        captured,
        ko: new_ko,
    })
}
