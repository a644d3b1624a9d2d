use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde::Serialize;

use rbaduk_analysis::fallback::FallbackContext;
use rbaduk_analysis::wire::AnalysisQuery;
use rbaduk_analysis::{AnalysisGateway, GatewayConfig};
use tools::{replay_tokens, ToolConfig};

/// 記録済みの着手列を再生して採点するハーネス。
///
/// # よく使うコマンド例
///
/// - ローカルフォールバックだけで採点（エンジン不要）:
///   `cargo run -p tools --bin analyze_replay -- game.txt`
///
/// - 設定した解析エンジン経由で採点:
///   `cargo run -p tools --bin analyze_replay -- game.txt --config rbaduk.toml --max-visits 500`
///
/// 入力は空白・改行区切りのワイヤ座標（黒から交互、`pass` 可）。結果は
/// JSON レポートで stdout または `--out` へ。
#[derive(Parser, Debug)]
#[command(author, version, about = "Replay a recorded game and score it")]
struct Cli {
    /// Move list file (whitespace-separated wire coordinates)
    moves_file: PathBuf,

    /// Board size
    #[arg(long, default_value_t = 19)]
    board_size: u8,

    /// Komi for the second player
    #[arg(long, default_value_t = 6.5)]
    komi: f64,

    /// Gateway config (TOML); omit to score locally
    #[arg(long)]
    config: Option<PathBuf>,

    /// Visit budget for the analysis engine
    #[arg(long)]
    max_visits: Option<u32>,

    /// Output path for the JSON report (stdout if omitted)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Print the final board to stderr
    #[arg(long, default_value_t = false)]
    show_board: bool,
}

#[derive(Serialize)]
struct Report {
    moves: usize,
    captures: [u32; 2],
    winrate: f32,
    score_lead: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    top_moves: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let text = std::fs::read_to_string(&cli.moves_file)
        .with_context(|| format!("failed to read {}", cli.moves_file.display()))?;
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let game = replay_tokens(&tokens, cli.board_size)?;
    info!(
        "replayed {} moves, captures B {} / W {}",
        game.moves.len(),
        game.captures[0],
        game.captures[1]
    );

    if cli.show_board {
        eprintln!("{}", game.board);
    }

    let gateway_config = match &cli.config {
        Some(path) => ToolConfig::load(path)?.gateway,
        None => GatewayConfig::default(),
    };
    let gateway = AnalysisGateway::new(gateway_config);
    let max_visits = cli.max_visits.unwrap_or_else(|| gateway.max_visits());

    let query = AnalysisQuery::from_moves(
        "analyze-replay".to_string(),
        &game.moves,
        cli.board_size,
        cli.komi,
        max_visits,
    );
    let ctx = FallbackContext {
        board: game.board,
        captures: game.captures,
    };
    let result = gateway.analyze(&query, &ctx).await;
    gateway.shutdown().await;

    let report = Report {
        moves: game.moves.len(),
        captures: game.captures,
        winrate: result.root_info.winrate,
        score_lead: result.root_info.score_lead,
        top_moves: result
            .move_infos
            .iter()
            .map(|m| m.move_coord.clone())
            .collect(),
    };
    let json = serde_json::to_string_pretty(&report)?;
    match &cli.out {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
