//! セッション層のエラー。
//!
//! ルール違反（盤上の却下）はエラーではなく [`crate::session::MoveOutcome`]
//! として返る。ここにあるのはセッションの使い方そのものの誤り。

use thiserror::Error;

use rbaduk_core::Color;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("unknown session {0}")]
    UnknownSession(String),

    #[error("session {0} already exists")]
    DuplicateSession(String),

    #[error("it is not {0:?}'s turn")]
    NotYourTurn(Color),

    #[error("session has already finished")]
    SessionEnded,

    #[error("session is waiting for scoring")]
    ScoringPending,

    #[error("this game mode does not support the requested action")]
    UnsupportedAction,

    #[error("no missiles left")]
    NoMissilesLeft,

    #[error("missile target is not an opposing stone")]
    InvalidMissileTarget,

    #[error("ko restriction is active")]
    KoRestriction,
}
