//! 終局時の地計算。
//!
//! 空点領域の単色包囲判定（flood fill）と、アゲハマ・死に石・コミを合算した
//! 最終スコアの算出。対局中のルール判定からは独立しており、終局処理と
//! 解析ゲートウェイのローカルフォールバックの両方から使われる。

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::types::{Color, Point};

/// 地の集計。`dame` はどちらの地にもならない中立点。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Territory {
    pub black: u32,
    pub white: u32,
    pub dame: u32,
}

/// 最終スコア。`winner == None` は持碁（引き分け）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinalScore {
    pub black: f64,
    pub white: f64,
    pub winner: Option<Color>,
    /// 勝者側から見た差。持碁では 0。
    pub margin: f64,
}

/// 空点領域を単色包囲なら当該色の地、混在なら dame として集計する。
///
/// 領域は空点の 4 近傍連結成分。領域に接する石（空点伝いに届くものも含む）が
/// 全て同色のときに限りその色の地になる。
pub fn territory(board: &Board) -> Territory {
    let size = usize::from(board.size());
    let mut visited = vec![false; size * size];
    let mut result = Territory::default();

    for p in board.points() {
        let idx = usize::from(p.y as u8) * size + usize::from(p.x as u8);
        if visited[idx] || board.get(p).is_some() {
            continue;
        }

        // 1 領域を走査し、接している色を記録する
        let mut region = 0u32;
        let mut touches = [false; Color::NUM];
        let mut queue = vec![p];
        visited[idx] = true;
        while let Some(cur) = queue.pop() {
            region += 1;
            for n in board.neighbors(cur) {
                match board.get(n) {
                    Some(c) => touches[c.index()] = true,
                    None => {
                        let ni = usize::from(n.y as u8) * size + usize::from(n.x as u8);
                        if !visited[ni] {
                            visited[ni] = true;
                            queue.push(n);
                        }
                    }
                }
            }
        }

        match (touches[Color::Black.index()], touches[Color::White.index()]) {
            (true, false) => result.black += region,
            (false, true) => result.white += region,
            // 両色に接する領域と、石が1つもない盤の全面は dame
            _ => result.dame += region,
        }
    }
    result
}

/// 最終スコアを計算する。
///
/// - `captures[c]` は色 `c` がこれまでに取り上げた石の数
/// - `dead` の石は盤から取り除かれ、所有者の敵方にアゲハマとして加算された
///   上で、空いた点は通常の地計算に委ねられる
/// - コミは後手（白）に加算される
pub fn score(board: &Board, captures: [u32; Color::NUM], dead: &[Point], komi: f64) -> FinalScore {
    let mut cleaned = board.clone();
    let mut dead_credit = [0u32; Color::NUM];
    for &p in dead {
        if let Some(owner) = cleaned.get(p) {
            cleaned.set(p, None);
            dead_credit[owner.opponent().index()] += 1;
        }
    }

    let t = territory(&cleaned);
    let black = f64::from(t.black)
        + f64::from(captures[Color::Black.index()])
        + f64::from(dead_credit[Color::Black.index()]);
    let white = f64::from(t.white)
        + f64::from(captures[Color::White.index()])
        + f64::from(dead_credit[Color::White.index()])
        + komi;

    let (winner, margin) = if black > white {
        (Some(Color::Black), black - white)
    } else if white > black {
        (Some(Color::White), white - black)
    } else {
        (None, 0.0)
    };
    FinalScore {
        black,
        white,
        winner,
        margin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(size: u8, stones: &[(i8, i8, Color)]) -> Board {
        let mut b = Board::new(size);
        for &(x, y, c) in stones {
            b.set(Point::new(x, y), Some(c));
        }
        b
    }

    #[test]
    fn empty_board_is_all_dame() {
        let t = territory(&Board::new(9));
        assert_eq!(t, Territory { black: 0, white: 0, dame: 81 });
    }

    #[test]
    fn wall_splits_board_into_two_territories() {
        // 5 路盤を黒の縦列 x=2 で分割し、左に白 1 子を置く
        let b = setup(
            5,
            &[
                (2, 0, Color::Black),
                (2, 1, Color::Black),
                (2, 2, Color::Black),
                (2, 3, Color::Black),
                (2, 4, Color::Black),
                (0, 2, Color::White),
            ],
        );
        let t = territory(&b);
        // 右側 10 点は黒のみに接する。左側は白にも接するので dame。
        assert_eq!(t.black, 10);
        assert_eq!(t.white, 0);
        assert_eq!(t.dame, 9);
    }

    #[test]
    fn enclosed_eye_counts_for_owner() {
        // 白 1 子を外側に置き、外の大きな領域を dame にする
        let b = setup(
            5,
            &[
                (1, 0, Color::Black),
                (0, 1, Color::Black),
                (1, 1, Color::Black),
                (4, 4, Color::White),
            ],
        );
        let t = territory(&b);
        assert_eq!(t.black, 1); // (0,0) の一眼のみ
        assert_eq!(t.white, 0);
        assert_eq!(t.dame, 20);
    }

    #[test]
    fn dead_stones_are_credited_and_their_points_scored() {
        // 黒の囲いの中に白の死に石が 1 子。外側には白の生き石があり
        // 外の領域は dame になる。
        let b = setup(
            5,
            &[
                (1, 0, Color::Black),
                (0, 1, Color::Black),
                (1, 1, Color::Black),
                (2, 0, Color::Black),
                (0, 0, Color::White),
                (4, 4, Color::White),
            ],
        );
        let dead = [Point::new(0, 0)];
        let s = score(&b, [0, 0], &dead, 0.0);
        // 死に石 1 + その点が黒地 1 = 2
        assert_eq!(s.black, 2.0);
        assert_eq!(s.white, 0.0);
        assert_eq!(s.winner, Some(Color::Black));
        assert_eq!(s.margin, 2.0);
    }

    #[test]
    fn komi_goes_to_white_and_breaks_ties() {
        let b = Board::new(9);
        let s = score(&b, [3, 3], &[], 6.5);
        assert_eq!(s.winner, Some(Color::White));
        assert_eq!(s.margin, 6.5);

        let s = score(&b, [3, 3], &[], 0.0);
        assert_eq!(s.winner, None);
        assert_eq!(s.margin, 0.0);
    }
}
