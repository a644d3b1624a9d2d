//! rbaduk-server: 対局セッションのオーケストレーション（transport 非依存）
//!
//! 着手 1 つごとに [`rbaduk_core::rules::apply`] を呼び、手番の切り替えで
//! [`rbaduk_core::SessionClock`] を進め、終局条件が立ったら
//! [`rbaduk_analysis::AnalysisGateway`] に採点を投げる、というセッション単位の
//! ループを提供する。TCP 等のトランスポートや、報酬・戦績などの下流
//! コラボレータはこの crate の外にあり、スナップショット JSON だけを受け取る。
//!
//! セッション内の着手は厳密に直列（手番を持つ側しか打てない）で、セッション
//! 間は共有盤面を持たないため完全に並列実行できる。

pub mod error;
pub mod modes;
pub mod scheduler;
pub mod session;

pub use error::SessionError;
pub use modes::{build_rules, GameMode, ModeRules};
pub use scheduler::{SessionStore, TimeoutReport};
pub use session::{
    EndCause, GameSession, MoveOutcome, SessionConfig, SessionSnapshot, SessionState,
};
