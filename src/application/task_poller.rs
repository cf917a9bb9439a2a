//! Client-side task poller.
//!
//! Polls the status endpoint on a fixed interval until the task reaches a
//! terminal state or the wall-clock budget runs out. Individual poll failures
//! are logged and do not end the loop; only the deadline, a terminal payload
//! or cancellation do. A timeout means "still unknown", not "failed".

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::domain::foundation::{Percentage, TaskId};
use crate::domain::generation::{SimulatedProgress, TaskState};
use crate::ports::TaskStatusSource;

/// Poll cadence and budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollerSettings {
    pub interval: Duration,
    pub max_wait: Duration,
    /// Fraction of the remaining gap the simulated progress closes per poll.
    pub progress_step: f64,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_wait: Duration::from_secs(600),
            progress_step: 0.05,
        }
    }
}

/// A task that finished with an artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedTask {
    pub task_id: TaskId,
    /// Locator of the generated artifact.
    pub result: String,
    /// Full status body as served.
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("Generation is taking longer than expected. Please check back later.")]
    Timeout { elapsed: Duration },

    #[error("{0}")]
    TaskFailed(String),

    #[error("polling cancelled")]
    Cancelled,
}

pub struct TaskPoller {
    source: Arc<dyn TaskStatusSource>,
    settings: PollerSettings,
}

impl TaskPoller {
    pub fn new(source: Arc<dyn TaskStatusSource>, settings: PollerSettings) -> Self {
        Self { source, settings }
    }

    /// Polls until `task_id` completes, fails, times out or `cancel` fires.
    ///
    /// `on_progress` receives a simulated percentage after every pending poll
    /// and 100 on completion. It is never consulted for decisions.
    pub async fn wait_for_completion<F>(
        &self,
        task_id: &TaskId,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<CompletedTask, PollError>
    where
        F: FnMut(Percentage) + Send,
    {
        let started = Instant::now();
        let deadline = started + self.settings.max_wait;
        let mut progress = SimulatedProgress::with_step_fraction(self.settings.progress_step);
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut attempts: u32 = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PollError::Cancelled),
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(PollError::Timeout { elapsed: started.elapsed() });
                }
                _ = ticker.tick() => {}
            }

            attempts += 1;
            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PollError::Cancelled),
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(PollError::Timeout { elapsed: started.elapsed() });
                }
                polled = self.source.poll(task_id) => polled,
            };

            match polled {
                Ok(body) => match TaskState::from_fields(&body) {
                    TaskState::Completed { result } => {
                        on_progress(Percentage::HUNDRED);
                        tracing::info!(task_id = %task_id, attempts, "Task completed");
                        return Ok(CompletedTask {
                            task_id: task_id.clone(),
                            result,
                            payload: body,
                        });
                    }
                    TaskState::Failed { error } => {
                        tracing::info!(task_id = %task_id, attempts, error = %error, "Task failed");
                        return Err(PollError::TaskFailed(error));
                    }
                    TaskState::Pending => {
                        on_progress(progress.advance());
                    }
                },
                Err(e) => {
                    tracing::warn!(task_id = %task_id, attempts, error = %e, "Status poll failed; retrying");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PollTransportError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // ════════════════════════════════════════════════════════════════════════════
    // Scripted status source
    // ════════════════════════════════════════════════════════════════════════════

    /// Pending until `pending_for` has elapsed, then `terminal`.
    /// Every `fail_every`-th poll errors instead.
    struct ScriptedSource {
        started: Instant,
        pending_for: Duration,
        terminal: Option<Value>,
        fail_every: Option<usize>,
        polls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(pending_for: Duration, terminal: Option<Value>) -> Self {
            Self {
                started: Instant::now(),
                pending_for,
                terminal,
                fail_every: None,
                polls: AtomicUsize::new(0),
            }
        }

        fn failing_every(mut self, n: usize) -> Self {
            self.fail_every = Some(n);
            self
        }

        fn polls(&self) -> usize {
            self.polls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TaskStatusSource for ScriptedSource {
        async fn poll(&self, _task_id: &TaskId) -> Result<Value, PollTransportError> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(every) = self.fail_every {
                if n % every == 0 {
                    return Err(PollTransportError::Unreachable("connection reset".to_string()));
                }
            }
            match &self.terminal {
                Some(terminal) if self.started.elapsed() >= self.pending_for => {
                    Ok(terminal.clone())
                }
                _ => Ok(json!({ "status": "pending" })),
            }
        }
    }

    fn task_id() -> TaskId {
        TaskId::new("abc123").unwrap()
    }

    fn completed() -> Value {
        json!({
            "task_id": "abc123",
            "status": "completed",
            "result": "https://cdn.example/img.png"
        })
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Terminal outcomes
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test(start_paused = true)]
    async fn completes_after_long_pending_period() {
        let source = Arc::new(ScriptedSource::new(Duration::from_secs(301), Some(completed())));
        let poller = TaskPoller::new(source.clone(), PollerSettings::default());

        let done = poller
            .wait_for_completion(&task_id(), &CancellationToken::new(), |_| {})
            .await
            .unwrap();

        assert_eq!(done.result, "https://cdn.example/img.png");
        assert_eq!(done.payload, completed());
        // Polls at t = 0, 2, ..., 302
        assert_eq!(source.polls(), 152);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_task_surfaces_embedded_error() {
        let source = Arc::new(ScriptedSource::new(
            Duration::from_secs(10),
            Some(json!({"task_id": "abc123", "status": "failed", "error": "provider overloaded"})),
        ));
        let poller = TaskPoller::new(source, PollerSettings::default());

        let err = poller
            .wait_for_completion(&task_id(), &CancellationToken::new(), |_| {})
            .await
            .unwrap_err();

        assert_eq!(err, PollError::TaskFailed("provider overloaded".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn completed_without_result_keeps_polling() {
        let source = Arc::new(ScriptedSource::new(
            Duration::ZERO,
            Some(json!({"status": "completed", "result": ""})),
        ));
        let settings = PollerSettings {
            max_wait: Duration::from_secs(20),
            ..PollerSettings::default()
        };
        let poller = TaskPoller::new(source, settings);

        let err = poller
            .wait_for_completion(&task_id(), &CancellationToken::new(), |_| {})
            .await
            .unwrap_err();

        assert!(matches!(err, PollError::Timeout { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn never_completing_task_times_out_at_ten_minutes() {
        let source = Arc::new(ScriptedSource::new(Duration::MAX, None));
        let poller = TaskPoller::new(source.clone(), PollerSettings::default());

        let err = poller
            .wait_for_completion(&task_id(), &CancellationToken::new(), |_| {})
            .await
            .unwrap_err();

        match err {
            PollError::Timeout { elapsed } => assert_eq!(elapsed, Duration::from_secs(600)),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert_eq!(source.polls(), 300);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Transport errors, progress and cancellation
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test(start_paused = true)]
    async fn transport_errors_do_not_stop_polling() {
        let source = Arc::new(
            ScriptedSource::new(Duration::from_secs(20), Some(completed())).failing_every(2),
        );
        let poller = TaskPoller::new(source, PollerSettings::default());

        let done = poller
            .wait_for_completion(&task_id(), &CancellationToken::new(), |_| {})
            .await;

        assert!(done.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn progress_is_monotonic_and_below_hundred_until_done() {
        let source = Arc::new(ScriptedSource::new(Duration::from_secs(120), Some(completed())));
        let poller = TaskPoller::new(source, PollerSettings::default());
        let seen = Mutex::new(Vec::new());

        poller
            .wait_for_completion(&task_id(), &CancellationToken::new(), |p| {
                seen.lock().unwrap().push(p)
            })
            .await
            .unwrap();

        let seen = seen.into_inner().unwrap();
        let (last, pending) = seen.split_last().unwrap();
        assert_eq!(*last, Percentage::HUNDRED);
        assert!(pending.windows(2).all(|w| w[0] <= w[1]));
        assert!(pending.iter().all(|p| !p.is_complete()));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_polling() {
        let source = Arc::new(ScriptedSource::new(Duration::MAX, None));
        let poller = TaskPoller::new(source, PollerSettings::default());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(7)).await;
            trigger.cancel();
        });

        let err = poller
            .wait_for_completion(&task_id(), &cancel, |_| {})
            .await
            .unwrap_err();

        assert_eq!(err, PollError::Cancelled);
    }
}
