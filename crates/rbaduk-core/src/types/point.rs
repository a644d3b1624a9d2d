//! 盤上の座標（Point）

use serde::{Deserialize, Serialize};

/// 盤上の交点。左上が (0, 0)、x が右方向、y が下方向。
///
/// (-1, -1) はパスを表す番兵で、盤上のセルを指すことはない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i8,
    pub y: i8,
}

impl Point {
    /// パスを表す番兵
    pub const PASS: Point = Point { x: -1, y: -1 };

    #[inline]
    pub const fn new(x: i8, y: i8) -> Self {
        Self { x, y }
    }

    /// パスか
    #[inline]
    pub const fn is_pass(self) -> bool {
        self.x < 0 || self.y < 0
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_pass() {
            write!(f, "pass")
        } else {
            write!(f, "({}, {})", self.x, self.y)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_sentinel() {
        assert!(Point::PASS.is_pass());
        assert!(!Point::new(0, 0).is_pass());
        assert_eq!(Point::PASS.to_string(), "pass");
    }
}
