//! 記録済み対局の replay・採点ハーネス。

pub mod config;
pub mod replay;

pub use config::ToolConfig;
pub use replay::{replay_tokens, ReplayedGame};
