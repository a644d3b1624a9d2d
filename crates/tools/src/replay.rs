//! ワイヤ表記の着手列を盤面に再生する。

use anyhow::{bail, Context, Result};

use rbaduk_analysis::wire::point_from_wire;
use rbaduk_core::rules::{apply, ApplyOptions, KoInfo};
use rbaduk_core::{Board, Color, Move};

/// 再生済みの対局
pub struct ReplayedGame {
    pub board: Board,
    pub moves: Vec<Move>,
    /// 色別のアゲハマ（取った側でインデックス）
    pub captures: [u32; Color::NUM],
}

/// 空白区切りの座標トークン列（黒から交互、`pass` 可）を適用する。
///
/// 不正な座標・ルール違反は記録データの破損としてエラーにする（対局サーバと
/// 違い、ここでは続行する意味がない）。
pub fn replay_tokens(tokens: &[&str], board_size: u8) -> Result<ReplayedGame> {
    let mut board = Board::new(board_size);
    let mut moves = Vec::new();
    let mut captures = [0u32; Color::NUM];
    let mut ko: Option<KoInfo> = None;
    let mut color = Color::Black;

    for (ply, token) in tokens.iter().enumerate() {
        let point = point_from_wire(token, board_size)
            .with_context(|| format!("invalid coordinate {token:?} at ply {ply}"))?;
        let mv = Move::new(point, color, ply as u32);
        let applied = match apply(&board, mv, ko, &ApplyOptions::default()) {
            Ok(applied) => applied,
            Err(rejection) => bail!("illegal move {token:?} at ply {ply}: {rejection}"),
        };
        captures[color.index()] += applied.captured.len() as u32;
        board = applied.board;
        ko = applied.ko;
        moves.push(mv);
        color = color.opponent();
    }

    Ok(ReplayedGame {
        board,
        moves,
        captures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbaduk_core::Point;

    #[test]
    fn replays_a_capture_sequence() {
        // 黒 D4, 白 C3, 黒 C2, 白 pass, 黒 B3 …ではなく単純な隅の取り:
        // B A2, W A1, B B1 → 白 A1 が取られる
        let game = replay_tokens(&["A2", "A1", "B1"], 9).unwrap();
        assert_eq!(game.captures, [1, 0]);
        assert_eq!(game.board.get(Point::new(0, 8)), None); // A1 は空に戻る
        assert_eq!(game.moves.len(), 3);
    }

    #[test]
    fn pass_tokens_are_accepted() {
        let game = replay_tokens(&["D4", "pass", "E5"], 9).unwrap();
        assert_eq!(game.moves.len(), 3);
        assert!(game.moves[1].is_pass());
    }

    #[test]
    fn corrupt_records_fail_loudly() {
        assert!(replay_tokens(&["I5"], 9).is_err());
        // 同一点への二度打ちは記録破損
        assert!(replay_tokens(&["D4", "D4"], 9).is_err());
    }
}
