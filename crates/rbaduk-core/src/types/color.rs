//! 石の色（Color）

use serde::{Deserialize, Serialize};

/// 石の色（黒/白）。黒が先着。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Color {
    Black = 0,
    White = 1,
}

impl Color {
    /// 色の数
    pub const NUM: usize = 2;

    /// 相手の色を返す
    #[inline]
    pub const fn opponent(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// インデックスとして使用（配列アクセス用）
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// 解析エンジンのワイヤ表記（"b" / "w"）
    #[inline]
    pub const fn wire_label(self) -> &'static str {
        match self {
            Color::Black => "b",
            Color::White => "w",
        }
    }

    /// ワイヤ表記からの復元。"b"/"B"/"black" 等を受け付ける。
    pub fn from_wire_label(s: &str) -> Option<Color> {
        match s {
            "b" | "B" | "black" | "Black" => Some(Color::Black),
            "w" | "W" | "white" | "White" => Some(Color::White),
            _ => None,
        }
    }

    /// スコア符号（黒 +1 / 白 -1）。scoreLead・ownership の向きと揃える。
    #[inline]
    pub const fn sign(self) -> f32 {
        match self {
            Color::Black => 1.0,
            Color::White => -1.0,
        }
    }
}

impl std::ops::Not for Color {
    type Output = Color;

    #[inline]
    fn not(self) -> Color {
        self.opponent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_opponent() {
        assert_eq!(Color::Black.opponent(), Color::White);
        assert_eq!(Color::White.opponent(), Color::Black);
        assert_eq!(!Color::Black, Color::White);
    }

    #[test]
    fn test_wire_label_round_trip() {
        for c in [Color::Black, Color::White] {
            assert_eq!(Color::from_wire_label(c.wire_label()), Some(c));
        }
        assert_eq!(Color::from_wire_label("W"), Some(Color::White));
        assert_eq!(Color::from_wire_label("x"), None);
    }
}
