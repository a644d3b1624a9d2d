//! subprocess tier の結線テスト。
//!
//! `/bin/cat` を疑似エンジンに使う: クエリ行がそのままエコーされ、`id` が
//! 一致する応答として demux される。応答には rootInfo が無いため、serde の
//! default（中立値）で埋まることも同時に確認できる。

#![cfg(unix)]

use std::time::Duration;

use rbaduk_analysis::{AnalysisQuery, EngineConfig, EngineService};

fn cat_engine(timeout: Duration) -> EngineService {
    let config = EngineConfig {
        binary: "/bin/cat".into(),
        model: None,
        config: None,
        extra_args: Vec::new(),
    };
    EngineService::new(config, timeout)
}

fn query(id: &str) -> AnalysisQuery {
    AnalysisQuery::from_moves(id.to_string(), &[], 9, 6.5, 10)
}

#[tokio::test]
async fn echoed_query_is_routed_back_by_id() {
    let engine = cat_engine(Duration::from_secs(5));
    let result = engine.query(&query("echo-1")).await.unwrap();
    assert_eq!(result.id, "echo-1");
    // エコーに rootInfo は無い → 中立 default
    assert_eq!(result.root_info.winrate, 0.5);
    assert_eq!(result.root_info.score_lead, 0.0);
    assert!(engine.is_alive());
    engine.stop().await;
}

#[tokio::test]
async fn concurrent_queries_never_cross_ids() {
    let engine = cat_engine(Duration::from_secs(5));
    let (qa, qb) = (query("s-a"), query("s-b"));
    let (a, b) = tokio::join!(engine.query(&qa), engine.query(&qb));
    assert_eq!(a.unwrap().id, "s-a");
    assert_eq!(b.unwrap().id, "s-b");
    engine.stop().await;
}

#[tokio::test]
async fn stopped_engine_is_lazily_respawned_on_next_query() {
    let engine = cat_engine(Duration::from_secs(5));
    engine.query(&query("r-1")).await.unwrap();
    engine.stop().await;
    assert!(!engine.is_alive());

    // stop 後の次のクエリが遅延再起動する
    let result = engine.query(&query("r-2")).await.unwrap();
    assert_eq!(result.id, "r-2");
    assert!(engine.is_alive());
    engine.stop().await;
}

#[tokio::test]
async fn timeout_fails_only_that_query() {
    // 応答を一切返さないプロセス（cat の stdin を閉じずに放置はできないので
    // 読み捨てる sleep を使う）
    let config = EngineConfig {
        binary: "/bin/sleep".into(),
        model: None,
        config: None,
        extra_args: vec!["60".to_string()],
    };
    let engine = EngineService::new(config, Duration::from_millis(200));
    let err = engine.query(&query("t-1")).await.unwrap_err();
    assert!(matches!(
        err,
        rbaduk_analysis::AnalysisError::Timeout { .. }
    ));
    engine.stop().await;
}
