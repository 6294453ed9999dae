//! # プロセスのライフサイクル
//!
//! `Running → Draining → Stopped` の状態を `tokio::sync::watch` で共有する。
//! グローバルなフラグは持たず、[`Lifecycle`] を必要な箇所へ渡す。
//!
//! - SIGINT / SIGTERM を最初に受信した時点で Draining に遷移する
//! - 同時に強制終了タイマーを起動し、期限内に Stopped にならなければ終了コード1で終了する
//! - 2回目以降のシグナルは警告ログのみ

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// ライフサイクルの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// 接続を受け付けている
    Running,
    /// 新規接続を止め、処理中のリクエストの完了を待っている
    Draining,
    /// すべてのリソースを解放した
    Stopped,
}

/// プロセスのライフサイクル
///
/// `Clone` は同じ状態を共有する。
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: Arc<watch::Sender<LifecycleState>>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(LifecycleState::Running);
        Self {
            state: Arc::new(tx),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Running から Draining に遷移する
    ///
    /// 遷移した場合のみ `true`。既に Draining / Stopped なら何もしない。
    pub fn begin_draining(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == LifecycleState::Running {
                *state = LifecycleState::Draining;
                true
            } else {
                false
            }
        })
    }

    /// Stopped に遷移する（何度呼んでもよい）
    pub fn mark_stopped(&self) {
        self.state.send_if_modified(|state| {
            if *state == LifecycleState::Stopped {
                false
            } else {
                *state = LifecycleState::Stopped;
                true
            }
        });
    }

    /// Running 以外になるまで待機する
    ///
    /// `axum::serve(...).with_graceful_shutdown` に渡す。
    pub async fn draining(&self) {
        let mut rx = self.state.subscribe();
        // 送信側は self が保持しているため、チャネルが閉じることはない
        let _ = rx.wait_for(|state| *state != LifecycleState::Running).await;
    }
}

/// シグナルを監視するタスクを起動する
///
/// 最初のシグナルで Draining に遷移し、`shutdown_timeout` 経過後も
/// Stopped になっていなければ `std::process::exit(1)` で強制終了する。
pub fn spawn_signal_listener(lifecycle: Lifecycle, shutdown_timeout: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut signals = Signals::register();

        loop {
            let Some(name) = signals.next().await else {
                return;
            };

            if lifecycle.begin_draining() {
                tracing::info!(
                    signal = name,
                    timeout_ms = shutdown_timeout.as_millis() as u64,
                    "Shutdown signal received, draining connections"
                );
                spawn_force_exit(lifecycle.clone(), shutdown_timeout);
            } else {
                tracing::warn!(
                    signal = name,
                    state = ?lifecycle.state(),
                    "Shutdown already in progress, ignoring signal"
                );
            }
        }
    })
}

fn spawn_force_exit(lifecycle: Lifecycle, timeout: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        if lifecycle.state() != LifecycleState::Stopped {
            tracing::error!(
                timeout_ms = timeout.as_millis() as u64,
                "Graceful shutdown timed out, forcing exit"
            );
            std::process::exit(1);
        }
    });
}

/// SIGINT（Ctrl+C）と SIGTERM の受信
struct Signals {
    #[cfg(unix)]
    terminate: Option<tokio::signal::unix::Signal>,
}

impl Signals {
    fn register() -> Self {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let terminate = match signal(SignalKind::terminate()) {
                Ok(stream) => Some(stream),
                Err(err) => {
                    tracing::warn!(error = %err, "Failed to install SIGTERM handler");
                    None
                }
            };
            Self { terminate }
        }
        #[cfg(not(unix))]
        {
            Self {}
        }
    }

    /// 次のシグナルを待ち、その名前を返す
    ///
    /// Ctrl+C ハンドラの登録に失敗した場合は `None`。
    async fn next(&mut self) -> Option<&'static str> {
        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => Some("SIGINT"),
                Err(err) => {
                    tracing::error!(error = %err, "Failed to listen for Ctrl+C");
                    None
                }
            },
            _ = self.terminate() => Some("SIGTERM"),
        }
    }

    #[cfg(unix)]
    async fn terminate(&mut self) {
        match self.terminate.as_mut() {
            Some(stream) => {
                if stream.recv().await.is_none() {
                    std::future::pending::<()>().await;
                }
            }
            None => std::future::pending::<()>().await,
        }
    }

    #[cfg(not(unix))]
    async fn terminate(&mut self) {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_running() {
        assert_eq!(Lifecycle::new().state(), LifecycleState::Running);
    }

    #[test]
    fn test_begin_draining_only_transitions_once() {
        let lifecycle = Lifecycle::new();

        assert!(lifecycle.begin_draining());
        assert!(!lifecycle.begin_draining());
        assert_eq!(lifecycle.state(), LifecycleState::Draining);
    }

    #[test]
    fn test_draining_is_ignored_after_stop() {
        let lifecycle = Lifecycle::new();
        lifecycle.begin_draining();
        lifecycle.mark_stopped();
        lifecycle.mark_stopped();

        assert!(!lifecycle.begin_draining());
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[test]
    fn test_clones_share_state() {
        let lifecycle = Lifecycle::new();
        let clone = lifecycle.clone();

        clone.begin_draining();

        assert_eq!(lifecycle.state(), LifecycleState::Draining);
    }

    #[tokio::test]
    async fn test_draining_future_resolves_on_transition() {
        let lifecycle = Lifecycle::new();
        let waiter = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.draining().await })
        };

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        lifecycle.begin_draining();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("draining future should resolve")
            .unwrap();
    }

    #[tokio::test]
    async fn test_draining_future_resolves_immediately_when_already_draining() {
        let lifecycle = Lifecycle::new();
        lifecycle.begin_draining();

        tokio::time::timeout(Duration::from_millis(100), lifecycle.draining())
            .await
            .expect("already draining");
    }
}
