//! rbaduk-core: 碁盤ルールの純粋実装
//!
//! 盤面遷移（着手・取り・コウ）、終局時の地計算、持ち時間の状態機械を提供する。
//! I/O・非同期・グローバル状態を持たず、全て呼び出し側から与えられた値のみで
//! 動作する。ネットワーク層・解析エンジン連携は上位 crate が担う。

pub mod board;
pub mod clock;
pub mod rules;
pub mod scoring;
pub mod types;

pub use board::Board;
pub use clock::{ClockSnapshot, Overtime, SessionClock, TimeSettings, TimeoutEvent};
pub use rules::{apply, Applied, ApplyOptions, KoInfo, MoveRejection};
pub use scoring::{score, territory, FinalScore, Territory};
pub use types::{Color, Move, Point};
