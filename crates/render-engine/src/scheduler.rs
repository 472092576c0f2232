//! Cancellable fixed-period tasks on the tokio runtime.
//!
//! A [`ScheduledTask`] calls its tick closure once per period until the
//! closure asks to stop or the task is cancelled. The closure receives the
//! task's [`CancelToken`] so it can re-check cancellation after taking
//! whatever lock guards the shared state; a cancel issued under that same
//! lock therefore guarantees no later tick does any work.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Whether a task wants another tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskControl {
    Continue,
    Stop,
}

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct ScheduledTask {
    name: &'static str,
    token: CancelToken,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Spawn `tick` every `period` on the current tokio runtime.
    ///
    /// Missed ticks are skipped rather than bunched up, so a slow tick
    /// never triggers a burst of catch-up ticks.
    pub fn spawn<F>(name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut(&CancelToken) -> TaskControl + Send + 'static,
    {
        let token = CancelToken::new();
        let task_token = token.clone();
        let period = period.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if task_token.is_cancelled() {
                    break;
                }
                if tick(&task_token) == TaskControl::Stop {
                    break;
                }
            }
            tracing::debug!(task = name, "Scheduled task exited");
        });

        tracing::debug!(task = name, period_ms = period.as_millis() as u64, "Scheduled task started");
        Self {
            name,
            token,
            handle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Stop scheduling. No tick starts after this returns, and a tick that
    /// re-checks the token under a shared lock sees the cancellation.
    pub fn cancel(&self) {
        self.token.cancel();
        self.handle.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel and wait for the task to wind down.
    pub async fn shutdown(mut self) {
        self.cancel();
        // An aborted task resolves to a cancellation error; that is the
        // expected outcome here.
        let _ = (&mut self.handle).await;
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
