//! 碁盤。サイズ固定の正方格子と、連・呼吸点の走査。
//!
//! 連（同色 4 近傍連結成分）は保存せず、取りの判定が必要になるたびに
//! 幅優先走査で再計算する。盤サイズはセッション生成時に固定され不変。

use smallvec::SmallVec;

use crate::types::{Color, Point};

/// 対応する盤サイズの下限
pub const MIN_BOARD_SIZE: u8 = 5;
/// 対応する盤サイズの上限（ワイヤ表記が A..Z から I を除いた 25 列まで）
pub const MAX_BOARD_SIZE: u8 = 25;

/// 連の走査結果。石の集合と呼吸点の数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    pub stones: Vec<Point>,
    pub liberties: usize,
}

/// N×N の碁盤。セルは空点または黒白の石。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: u8,
    cells: Vec<Option<Color>>,
}

impl Board {
    /// 空の盤を作る。
    ///
    /// # Panics
    ///
    /// `size` が [`MIN_BOARD_SIZE`]..=[`MAX_BOARD_SIZE`] の外の場合。
    pub fn new(size: u8) -> Self {
        assert!(
            (MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&size),
            "board size {size} out of range"
        );
        Self {
            size,
            cells: vec![None; usize::from(size) * usize::from(size)],
        }
    }

    #[inline]
    pub fn size(&self) -> u8 {
        self.size
    }

    #[inline]
    fn idx(&self, p: Point) -> usize {
        usize::from(p.y as u8) * usize::from(self.size) + usize::from(p.x as u8)
    }

    /// 盤内か。パス番兵は盤内ではない。
    #[inline]
    pub fn in_bounds(&self, p: Point) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as u8) < self.size && (p.y as u8) < self.size
    }

    /// セルの状態。盤外は空点と同様 `None` を返す。
    #[inline]
    pub fn get(&self, p: Point) -> Option<Color> {
        if !self.in_bounds(p) {
            return None;
        }
        self.cells[self.idx(p)]
    }

    /// 盤面を直接編集する低水準操作。通常の着手は [`crate::rules::apply`] を
    /// 使うこと（盤面セットアップと特殊モードの強制配置・除去のみが使う）。
    #[inline]
    pub fn set(&mut self, p: Point, cell: Option<Color>) {
        debug_assert!(self.in_bounds(p));
        let i = self.idx(p);
        self.cells[i] = cell;
    }

    /// 4近傍（盤内のみ）
    pub fn neighbors(&self, p: Point) -> SmallVec<[Point; 4]> {
        let mut out = SmallVec::new();
        for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
            let n = Point::new(p.x + dx, p.y + dy);
            if self.in_bounds(n) {
                out.push(n);
            }
        }
        out
    }

    /// 全交点を走査するイテレータ
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        // MAX_BOARD_SIZE = 25 なので i8 に収まる
        let size = self.size as i8;
        (0..size).flat_map(move |y| (0..size).map(move |x| Point::new(x, y)))
    }

    /// `p` の石が属する連と呼吸点の数。空点なら `None`。
    ///
    /// 呼吸点は重複なく数える（コウ判定が「呼吸点ちょうど1」を要求するため）。
    pub fn group(&self, p: Point) -> Option<GroupInfo> {
        let color = self.get(p)?;
        let cap = usize::from(self.size) * usize::from(self.size);
        let mut visited = vec![false; cap];
        let mut lib_seen = vec![false; cap];
        let mut stones = Vec::new();
        let mut liberties = 0usize;
        let mut queue = vec![p];
        visited[self.idx(p)] = true;

        while let Some(cur) = queue.pop() {
            stones.push(cur);
            for n in self.neighbors(cur) {
                let ni = self.idx(n);
                match self.get(n) {
                    None => {
                        if !lib_seen[ni] {
                            lib_seen[ni] = true;
                            liberties += 1;
                        }
                    }
                    Some(c) if c == color && !visited[ni] => {
                        visited[ni] = true;
                        queue.push(n);
                    }
                    _ => {}
                }
            }
        }
        Some(GroupInfo { stones, liberties })
    }

    /// 石の数（色別）
    pub fn stone_count(&self, color: Color) -> usize {
        self.cells.iter().filter(|c| **c == Some(color)).count()
    }

    /// 盤面をそのまま2次元配列にしたもの（スナップショット用）
    pub fn grid(&self) -> Vec<Vec<Option<Color>>> {
        let size = usize::from(self.size);
        (0..size)
            .map(|y| (0..size).map(|x| self.cells[y * size + x]).collect())
            .collect()
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for y in 0..self.size as i8 {
            for x in 0..self.size as i8 {
                let ch = match self.get(Point::new(x, y)) {
                    Some(Color::Black) => 'X',
                    Some(Color::White) => 'O',
                    None => '.',
                };
                write!(f, "{ch} ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(stones: &[(i8, i8, Color)]) -> Board {
        let mut b = Board::new(9);
        for &(x, y, c) in stones {
            b.set(Point::new(x, y), Some(c));
        }
        b
    }

    #[test]
    fn neighbors_clip_at_edges() {
        let b = Board::new(9);
        assert_eq!(b.neighbors(Point::new(0, 0)).len(), 2);
        assert_eq!(b.neighbors(Point::new(8, 8)).len(), 2);
        assert_eq!(b.neighbors(Point::new(4, 0)).len(), 3);
        assert_eq!(b.neighbors(Point::new(4, 4)).len(), 4);
    }

    #[test]
    fn group_counts_distinct_liberties() {
        // 2 連の黒石。共有する空点 (1, 1) を二重に数えないこと。
        let b = board_with(&[(0, 1, Color::Black), (1, 0, Color::Black)]);
        let g = b.group(Point::new(0, 1)).unwrap();
        assert_eq!(g.stones.len(), 1);
        assert_eq!(g.liberties, 3);

        let b = board_with(&[
            (1, 1, Color::Black),
            (2, 1, Color::Black),
            (1, 2, Color::White),
            (2, 2, Color::White),
        ]);
        let g = b.group(Point::new(1, 1)).unwrap();
        assert_eq!(g.stones.len(), 2);
        // (0,1) (1,0) (2,0) (3,1) の4点
        assert_eq!(g.liberties, 4);
    }

    #[test]
    fn group_on_empty_point_is_none() {
        let b = Board::new(9);
        assert!(b.group(Point::new(4, 4)).is_none());
    }

    #[test]
    fn out_of_bounds_reads_as_empty() {
        let b = Board::new(9);
        assert_eq!(b.get(Point::new(-1, 0)), None);
        assert_eq!(b.get(Point::new(9, 0)), None);
        assert!(!b.in_bounds(Point::PASS));
    }
}
