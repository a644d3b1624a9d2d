//! 常駐解析エンジン subprocess tier（tier 2）。
//!
//! 1 つの長寿命な子プロセスと行区切り JSON で通信する。子プロセスは最初の
//! クエリで遅延起動し、落ちた場合は保留中の要求を全て拒否した上で「死亡」
//! マークだけ付け、次のクエリが再び遅延起動する。
//!
//! 応答は reader タスクが改行単位で読み、`id` で保留テーブルから該当する
//! 待ち手を引いて配送する。テーブルはプロセスをまたいで全セッションが共有
//! するが、id 発行後の要求スロットは互いに独立で、応答の取り違えは起きない。
//! spawn・respawn・stop は [`EngineService`] 内部の単一の lock を通る。

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{oneshot, Mutex};
use tokio::time::timeout;

use crate::config::EngineConfig;
use crate::error::AnalysisError;
use crate::wire::{decode_result, AnalysisQuery, AnalysisResult};

/// id → 応答行の配送先。エントリの drop が待ち手への拒否通知になる。
type PendingMap = Arc<StdMutex<HashMap<String, oneshot::Sender<String>>>>;

/// 起動済みプロセスのハンドル
struct RunningEngine {
    child: Child,
    stdin: ChildStdin,
}

/// 解析エンジン subprocess のライフサイクルを持つサービスオブジェクト。
///
/// モジュールグローバルは持たず、設定は生成時に注入される。
pub struct EngineService {
    config: EngineConfig,
    query_timeout: Duration,
    /// spawn / respawn / stop の単一の変更点
    state: Mutex<Option<RunningEngine>>,
    pending: PendingMap,
    alive: Arc<AtomicBool>,
}

impl EngineService {
    pub fn new(config: EngineConfig, query_timeout: Duration) -> Self {
        Self {
            config,
            query_timeout,
            state: Mutex::new(None),
            pending: Arc::new(StdMutex::new(HashMap::new())),
            alive: Arc::new(AtomicBool::new(false)),
        }
    }

    /// プロセスが生きているか（クエリを投げれば必要に応じて再起動される）
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// 明示的な事前起動。通常は最初のクエリに任せてよい。
    pub async fn start(&self) -> Result<(), AnalysisError> {
        let mut state = self.state.lock().await;
        self.ensure_started_locked(&mut state)
    }

    /// プロセスを止め、保留中の要求を全て拒否する。
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        if let Some(mut engine) = state.take() {
            info!("stopping analysis engine");
            let _ = engine.child.kill().await;
        }
        self.alive.store(false, Ordering::SeqCst);
        reject_all(&self.pending);
    }

    /// 1 クエリを送り、対応する応答を待つ。
    ///
    /// タイムアウトはこのクエリだけを失敗させ、プロセスは生かしたままにする。
    /// プロセスが落ちていた場合は保留エントリごと拒否され、次の呼び出しが
    /// 再起動を試みる。
    pub async fn query(&self, query: &AnalysisQuery) -> Result<AnalysisResult, AnalysisError> {
        // 応答を取りこぼさないよう、書き込みより先に登録する
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().expect("pending map poisoned");
            pending.insert(query.id.clone(), tx);
        }

        if let Err(err) = self.send_query(query).await {
            let mut pending = self.pending.lock().expect("pending map poisoned");
            pending.remove(&query.id);
            return Err(err);
        }

        match timeout(self.query_timeout, rx).await {
            Ok(Ok(line)) => decode_result(&line),
            // 送信側 drop = reader がプロセス死亡時に全拒否した
            Ok(Err(_)) => Err(AnalysisError::ProcessDead),
            Err(_) => {
                let mut pending = self.pending.lock().expect("pending map poisoned");
                pending.remove(&query.id);
                Err(AnalysisError::Timeout {
                    id: query.id.clone(),
                    timeout_secs: self.query_timeout.as_secs(),
                })
            }
        }
    }

    async fn send_query(&self, query: &AnalysisQuery) -> Result<(), AnalysisError> {
        let mut line = serde_json::to_string(query)?;
        line.push('\n');

        let mut state = self.state.lock().await;
        self.ensure_started_locked(&mut state)?;
        let engine = state.as_mut().ok_or(AnalysisError::ProcessDead)?;
        debug!("sending analysis query {}", query.id);
        if let Err(err) = engine.stdin.write_all(line.as_bytes()).await {
            self.alive.store(false, Ordering::SeqCst);
            return Err(AnalysisError::Io(err));
        }
        if let Err(err) = engine.stdin.flush().await {
            self.alive.store(false, Ordering::SeqCst);
            return Err(AnalysisError::Io(err));
        }
        Ok(())
    }

    /// `state` の lock を握った状態でプロセスの存在を保証する。
    fn ensure_started_locked(
        &self,
        state: &mut Option<RunningEngine>,
    ) -> Result<(), AnalysisError> {
        if state.is_some() && self.alive.load(Ordering::SeqCst) {
            return Ok(());
        }

        // 死んだハンドルの後始末。旧プロセス宛の保留要求はここで全て拒否する。
        if let Some(mut old) = state.take() {
            let _ = old.child.start_kill();
        }
        reject_all(&self.pending);

        info!("starting analysis engine: {}", self.config.binary.display());
        let mut cmd = Command::new(&self.config.binary);
        if let Some(model) = &self.config.model {
            cmd.arg("-model").arg(model);
        }
        if let Some(engine_cfg) = &self.config.config {
            cmd.arg("-config").arg(engine_cfg);
        }
        cmd.args(&self.config.extra_args);
        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(AnalysisError::Spawn)?;

        let stdin = child.stdin.take().ok_or(AnalysisError::ProcessDead)?;
        let stdout = child.stdout.take().ok_or(AnalysisError::ProcessDead)?;
        let stderr = child.stderr.take().ok_or(AnalysisError::ProcessDead)?;

        self.alive.store(true, Ordering::SeqCst);
        spawn_reader_tasks(stdout, stderr, self.pending.clone(), self.alive.clone());
        *state = Some(RunningEngine { child, stdin });
        Ok(())
    }
}

/// 保留テーブルを空にする。エントリの drop で待ち手は拒否を受け取る。
fn reject_all(pending: &PendingMap) {
    let mut pending = pending.lock().expect("pending map poisoned");
    if !pending.is_empty() {
        warn!("rejecting {} pending analysis request(s)", pending.len());
    }
    pending.clear();
}

/// stdout の demux と stderr の排水
fn spawn_reader_tasks(
    stdout: tokio::process::ChildStdout,
    stderr: tokio::process::ChildStderr,
    pending: PendingMap,
    alive: Arc<AtomicBool>,
) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!("analysis engine stderr: {line}");
        }
    });

    tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => dispatch_line(&line, &pending),
                Ok(None) => {
                    info!("analysis engine stdout closed");
                    break;
                }
                Err(err) => {
                    warn!("error reading analysis engine stdout: {err}");
                    break;
                }
            }
        }
        // EOF / 読み取りエラー = プロセス死亡とみなす
        alive.store(false, Ordering::SeqCst);
        reject_all(&pending);
    });
}

/// 1 行を `id` で配送する
fn dispatch_line(line: &str, pending: &PendingMap) {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return;
    }
    let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        debug!("non-JSON line from analysis engine: {trimmed}");
        return;
    };
    let Some(id) = value.get("id").and_then(|v| v.as_str()) else {
        debug!("analysis engine line without id: {trimmed}");
        return;
    };
    let sender = {
        let mut pending = pending.lock().expect("pending map poisoned");
        pending.remove(id)
    };
    match sender {
        Some(tx) => {
            if tx.send(trimmed.to_string()).is_err() {
                // 待ち手がタイムアウト済みで消えた後に応答が届いた
                debug!("late analysis response for {id} discarded");
            }
        }
        None => debug!("analysis response for unknown or timed-out id {id}"),
    }
}
