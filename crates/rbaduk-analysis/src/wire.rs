//! 解析エンジンのワイヤ表記と JSON 型。
//!
//! 座標は列を英字（`I` を飛ばした A..Z）、行を盤の遠端から数えた数字で表す
//! 伝統的な表記。パス番兵は `"pass"`。JSON は camelCase で、subprocess では
//! 行区切り、HTTP では同じものが body になる。

use serde::{Deserialize, Serialize};

use rbaduk_core::{Board, Color, Move, Point};

/// 盤上の点をワイヤ表記にする（例: (0,0) on 19路 → "A19"）。
///
/// 列英字は `I` を飛ばす。行番号は盤の遠端（y = 0 側）が最大で、手前が 1。
pub fn point_to_wire(p: Point, board_size: u8) -> String {
    if p.is_pass() {
        return "pass".to_string();
    }
    let x = p.x as u8;
    let letter = if x < 8 {
        (b'A' + x) as char
    } else {
        (b'A' + x + 1) as char
    };
    let row = u32::from(board_size) - u32::from(p.y as u8);
    format!("{letter}{row}")
}

/// ワイヤ表記から点を復元する。`"pass"` は大文字小文字を問わない。
pub fn point_from_wire(s: &str, board_size: u8) -> Option<Point> {
    if s.eq_ignore_ascii_case("pass") {
        return Some(Point::PASS);
    }
    if s.len() < 2 {
        return None;
    }
    let mut chars = s.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    if letter == 'I' || !letter.is_ascii_uppercase() {
        return None;
    }
    let raw = letter as u8 - b'A';
    let x = if letter < 'I' { raw } else { raw - 1 };
    if x >= board_size {
        return None;
    }
    let row: u8 = chars.as_str().parse().ok()?;
    if row == 0 || row > board_size {
        return None;
    }
    let y = board_size - row;
    Some(Point::new(x as i8, y as i8))
}

/// 着手列をワイヤ表記のペア（[色, 座標]）に変換する
pub fn moves_to_wire(moves: &[Move], board_size: u8) -> Vec<(String, String)> {
    moves
        .iter()
        .map(|m| {
            (
                m.color.wire_label().to_string(),
                point_to_wire(m.point, board_size),
            )
        })
        .collect()
}

/// ワイヤ表記のペア列から着手列を復元する。不正な要素があれば None。
pub fn moves_from_wire(pairs: &[(String, String)], board_size: u8) -> Option<Vec<Move>> {
    pairs
        .iter()
        .enumerate()
        .map(|(i, (color, coord))| {
            let color = Color::from_wire_label(color)?;
            let point = point_from_wire(coord, board_size)?;
            Some(Move::new(point, color, i as u32))
        })
        .collect()
}

/// 解析クエリ。`id` で応答と 1:1 に対応づけられる。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisQuery {
    pub id: String,
    /// 着手列（[色, 座標] のペア）。`initial_stones` と排他ではなく併用可。
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub moves: Vec<(String, String)>,
    /// 置石など、着手列に先立つ初期配置
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub initial_stones: Vec<(String, String)>,
    pub rules: String,
    pub komi: f64,
    pub board_x_size: u8,
    pub board_y_size: u8,
    pub max_visits: u32,
    pub include_ownership: bool,
}

impl AnalysisQuery {
    /// 既定ルール文字列
    pub const DEFAULT_RULES: &'static str = "korean";

    /// 着手履歴からクエリを組み立てる
    pub fn from_moves(id: String, moves: &[Move], board_size: u8, komi: f64, max_visits: u32) -> Self {
        Self {
            id,
            moves: moves_to_wire(moves, board_size),
            initial_stones: Vec::new(),
            rules: Self::DEFAULT_RULES.to_string(),
            komi,
            board_x_size: board_size,
            board_y_size: board_size,
            max_visits,
            include_ownership: true,
        }
    }
}

/// 解析応答のルート情報。欠けていても構造的に有効な中立値で埋まる。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RootInfo {
    /// 黒番から見た勝率 [0, 1]
    pub winrate: f32,
    /// 黒番から見た目差（正が黒リード）
    pub score_lead: f32,
}

impl Default for RootInfo {
    fn default() -> Self {
        Self {
            winrate: 0.5,
            score_lead: 0.0,
        }
    }
}

/// 候補手の情報
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct MoveInfo {
    #[serde(rename = "move")]
    pub move_coord: String,
    pub winrate: f32,
    pub score_lead: f32,
    pub visits: u32,
    pub order: u32,
}

/// 解析応答。`id` でクエリと対応づけられる。未知フィールドは無視し、
/// 欠けたフィールドは default で埋めて、エンジン実装差を吸収する。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub id: String,
    #[serde(default)]
    pub root_info: RootInfo,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub move_infos: Vec<MoveInfo>,
    /// 交点ごとの帰属 [-1, 1]（正が黒）。盤の行優先順（y * size + x）。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ownership: Option<Vec<f32>>,
}

/// 応答テキスト 1 件を解釈する。transport（subprocess の 1 行 / HTTP body）に
/// 依存しない共通の復号点で、`{"error": ...}` はエンジン側エラーとして
/// 区別する。
pub fn decode_result(text: &str) -> Result<AnalysisResult, crate::error::AnalysisError> {
    match serde_json::from_str::<AnalysisResult>(text) {
        Ok(result) => Ok(result),
        Err(parse_err) => {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
                if let Some(msg) = value.get("error") {
                    return Err(crate::error::AnalysisError::Engine(msg.to_string()));
                }
            }
            Err(crate::error::AnalysisError::Parse(parse_err))
        }
    }
}

/// ownership から死に石の座標を抽出する。
///
/// 自色の符号と逆向きに `threshold` 以上振れている石を死にとみなす。
/// ownership が盤サイズに合わない場合は空を返す（fallback tier の経路）。
pub fn dead_stones(board: &Board, ownership: &[f32], threshold: f32) -> Vec<Point> {
    let size = usize::from(board.size());
    if ownership.len() != size * size {
        return Vec::new();
    }
    board
        .points()
        .filter(|p| {
            let Some(owner) = board.get(*p) else {
                return false;
            };
            let idx = usize::from(p.y as u8) * size + usize::from(p.x as u8);
            ownership[idx] * owner.sign() <= -threshold
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_notation_skips_column_i() {
        // 9路: 9列目は I を飛ばして J
        assert_eq!(point_to_wire(Point::new(0, 8), 9), "A1");
        assert_eq!(point_to_wire(Point::new(8, 0), 9), "J9");
        assert_eq!(point_to_wire(Point::new(7, 4), 9), "H5");
        // 19路: 最終列は T
        assert_eq!(point_to_wire(Point::new(18, 0), 19), "T19");
        assert_eq!(point_from_wire("I5", 9), None);
        assert_eq!(point_from_wire("K1", 9), None); // 9路に10列目はない
        assert_eq!(point_from_wire("A0", 9), None);
        assert_eq!(point_from_wire("A10", 9), None);
    }

    #[test]
    fn pass_maps_to_sentinel_both_ways() {
        assert_eq!(point_to_wire(Point::PASS, 19), "pass");
        assert_eq!(point_from_wire("pass", 19), Some(Point::PASS));
        assert_eq!(point_from_wire("PASS", 9), Some(Point::PASS));
    }

    #[test]
    fn move_list_round_trips_exactly() {
        for size in [5u8, 9, 13, 19, 25] {
            let last = size as i8 - 1;
            let moves: Vec<Move> = vec![
                Move::new(Point::new(0, 0), Color::Black, 0),
                Move::new(Point::new(last, 0), Color::White, 1),
                Move::new(Point::PASS, Color::Black, 2),
                Move::new(Point::new(3, last), Color::White, 3),
            ];
            let wire = moves_to_wire(&moves, size);
            let back = moves_from_wire(&wire, size).unwrap();
            assert_eq!(back, moves, "size {size}");
        }
    }

    #[test]
    fn query_serializes_camel_case() {
        let q = AnalysisQuery::from_moves("q1".into(), &[], 9, 6.5, 100);
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["boardXSize"], 9);
        assert_eq!(json["maxVisits"], 100);
        assert_eq!(json["includeOwnership"], true);
        assert_eq!(json["rules"], "korean");
        // 空の moves / initialStones は省略される
        assert!(json.get("moves").is_none());
    }

    #[test]
    fn result_tolerates_missing_fields() {
        let r: AnalysisResult = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert_eq!(r.id, "x");
        assert_eq!(r.root_info.winrate, 0.5);
        assert!(r.move_infos.is_empty());
        assert!(r.ownership.is_none());
    }

    #[test]
    fn decode_distinguishes_engine_errors() {
        let ok = decode_result(r#"{"id":"a","rootInfo":{"winrate":0.7,"scoreLead":3.5}}"#).unwrap();
        assert_eq!(ok.id, "a");
        assert_eq!(ok.root_info.score_lead, 3.5);

        let err = decode_result(r#"{"error":"unknown field"}"#).unwrap_err();
        assert!(matches!(err, crate::error::AnalysisError::Engine(_)));

        let err = decode_result("not json").unwrap_err();
        assert!(matches!(err, crate::error::AnalysisError::Parse(_)));
    }

    #[test]
    fn dead_stone_extraction_uses_sign_against_owner() {
        let mut board = Board::new(5);
        board.set(Point::new(0, 0), Some(Color::Black));
        board.set(Point::new(4, 4), Some(Color::White));
        let mut ownership = vec![0.0f32; 25];
        ownership[0] = -0.9; // 黒石が白帰属 → 死に
        ownership[24] = -0.9; // 白石が白帰属 → 生き
        let dead = dead_stones(&board, &ownership, 0.6);
        assert_eq!(dead, vec![Point::new(0, 0)]);

        // サイズ不一致は空（fallback 経路）
        assert!(dead_stones(&board, &[0.0; 3], 0.6).is_empty());
    }
}
