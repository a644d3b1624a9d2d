//! rbaduk-analysis: 形勢解析ゲートウェイ
//!
//! 終局・進行中の局面に対する勝率・目差・ownership の推定を、3 段の tier で
//! 解決する:
//!
//! 1. リモート HTTP エンドポイント（設定時のみ）
//! 2. 常駐 subprocess エンジン（行区切り JSON、遅延起動・死活管理つき）
//! 3. ローカル決定的スコアラ（flood fill 地合い計算、失敗しない終端）
//!
//! [`AnalysisGateway::analyze`] は呼び出し側にエラーを返さない。上位 tier の
//! 失敗は握り潰さずログに残した上で次の tier に落ちる。

pub mod config;
pub mod error;
pub mod fallback;
pub mod gateway;
pub mod http;
pub mod subprocess;
pub mod wire;

pub use config::{EngineConfig, GatewayConfig, HttpConfig};
pub use error::AnalysisError;
pub use fallback::{local_score_result, FallbackContext};
pub use gateway::AnalysisGateway;
pub use subprocess::EngineService;
pub use wire::{
    dead_stones, decode_result, point_from_wire, point_to_wire, AnalysisQuery, AnalysisResult,
    MoveInfo, RootInfo,
};
