//! ローカル決定的フォールバック（tier 3）。
//!
//! 盤面とアゲハマだけから flood fill の地合い計算で結果を合成する。外部
//! プロセスにも I/O にも依存せず、構造的に失敗しない保証された終端。
//! ownership の確率的な精緻化は行わない。

use rbaduk_core::scoring::score;
use rbaduk_core::{Board, Color};

use crate::wire::{AnalysisResult, RootInfo};

/// フォールバックに渡す対局の実体。履歴の replay ではなく、今ある盤面と
/// アゲハマのカウンタにそのまま作用する。
#[derive(Debug, Clone)]
pub struct FallbackContext {
    pub board: Board,
    /// 色別のアゲハマ（取った側でインデックス）
    pub captures: [u32; Color::NUM],
}

/// 盤面から決定的に解析結果を合成する。
///
/// - `score_lead` は黒から見た最終スコア差
/// - 勝率は目差の符号のみから決める（0 / 0.5 / 1 の三値）
/// - ownership は石と地の帰属を ±1、dame を 0 とした粗い盤面図
pub fn local_score_result(id: &str, ctx: &FallbackContext, komi: f64) -> AnalysisResult {
    let final_score = score(&ctx.board, ctx.captures, &[], komi);
    let lead = final_score.black - final_score.white;
    let winrate = match lead.partial_cmp(&0.0) {
        Some(std::cmp::Ordering::Greater) => 1.0,
        Some(std::cmp::Ordering::Less) => 0.0,
        _ => 0.5,
    };

    AnalysisResult {
        id: id.to_string(),
        root_info: RootInfo {
            winrate,
            score_lead: lead as f32,
        },
        move_infos: Vec::new(),
        ownership: Some(ownership_map(&ctx.board)),
    }
}

/// 石と単色包囲地を ±1、それ以外を 0 とした ownership 図。
/// 領域判定は scoring と同じ規則（空点の 4 近傍連結成分ごと）。
fn ownership_map(board: &Board) -> Vec<f32> {
    let size = usize::from(board.size());
    let idx = |p: rbaduk_core::Point| usize::from(p.y as u8) * size + usize::from(p.x as u8);
    let mut map = vec![0.0f32; size * size];
    let mut visited = vec![false; size * size];

    for p in board.points() {
        if let Some(c) = board.get(p) {
            map[idx(p)] = c.sign();
            continue;
        }
        if visited[idx(p)] {
            continue;
        }

        // 1 領域を走査し、接している色を集めてからまとめて塗る
        let mut touches = [false; Color::NUM];
        let mut region = Vec::new();
        let mut queue = vec![p];
        visited[idx(p)] = true;
        while let Some(cur) = queue.pop() {
            region.push(cur);
            for n in board.neighbors(cur) {
                match board.get(n) {
                    Some(c) => touches[c.index()] = true,
                    None => {
                        if !visited[idx(n)] {
                            visited[idx(n)] = true;
                            queue.push(n);
                        }
                    }
                }
            }
        }
        let value = match (touches[Color::Black.index()], touches[Color::White.index()]) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        };
        for r in region {
            map[idx(r)] = value;
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbaduk_core::scoring::territory;
    use rbaduk_core::Point;

    #[test]
    fn fallback_result_is_structurally_valid() {
        let ctx = FallbackContext {
            board: Board::new(9),
            captures: [0, 0],
        };
        let r = local_score_result("f1", &ctx, 6.5);
        assert_eq!(r.id, "f1");
        // 空盤はコミ分だけ白リード
        assert_eq!(r.root_info.score_lead, -6.5);
        assert_eq!(r.root_info.winrate, 0.0);
        assert_eq!(r.ownership.as_ref().unwrap().len(), 81);
    }

    #[test]
    fn fallback_score_matches_flood_fill_reference() {
        // 5路盤を黒壁で分割した盤。地計算の独立参照と一致すること。
        let mut board = Board::new(5);
        for y in 0..5i8 {
            board.set(Point::new(2, y), Some(Color::Black));
        }
        board.set(Point::new(0, 2), Some(Color::White));
        let reference = territory(&board);
        let ctx = FallbackContext {
            board: board.clone(),
            captures: [2, 1],
        };
        let r = local_score_result("f2", &ctx, 0.0);
        // 黒地 + 黒アゲハマ − (白地 + 白アゲハマ)
        let expected =
            f64::from(reference.black) + 2.0 - (f64::from(reference.white) + 1.0);
        assert_eq!(f64::from(r.root_info.score_lead), expected);
        assert_eq!(r.root_info.winrate, 1.0);
    }

    #[test]
    fn ownership_marks_stones_and_enclosed_territory() {
        let mut board = Board::new(5);
        board.set(Point::new(1, 0), Some(Color::Black));
        board.set(Point::new(0, 1), Some(Color::Black));
        board.set(Point::new(4, 4), Some(Color::White));
        let r = local_score_result("f3", &FallbackContext { board, captures: [0, 0] }, 0.0);
        let map = r.ownership.unwrap();
        assert_eq!(map[1], 1.0); // 黒石
        assert_eq!(map[0], 1.0); // 黒の一眼
        assert_eq!(map[24], -1.0); // 白石
        assert_eq!(map[12], 0.0); // dame
    }
}
