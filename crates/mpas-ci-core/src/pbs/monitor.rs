use super::{JobId, Scheduler};
use crate::errors::RunError;
use crate::matchers::match_regex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::{Duration, Instant};

const JOB_STATE_RE: &str = r"job_state = (\w)";
const EXIT_STATUS_RE: &str = r"Exit_status = ([0-9]+)";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    pub initial_delay_secs: u64,
    pub poll_interval_secs: u64,
    /// `None` waits forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: 10,
            poll_interval_secs: 1,
            timeout_secs: None,
        }
    }
}

impl MonitorConfig {
    pub fn immediate() -> Self {
        Self {
            initial_delay_secs: 0,
            poll_interval_secs: 0,
            timeout_secs: None,
        }
    }
}

/// Shared flag that interrupts job waits.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Sleeps for `d`; returns `true` if cancelled before or during the sleep.
    pub async fn sleep(&self, d: Duration) -> bool {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_cancelled() {
            return true;
        }
        tokio::select! {
            _ = tokio::time::sleep(d) => self.is_cancelled(),
            _ = &mut notified => true,
        }
    }
}

/// Polls the scheduler until `job` reports an exited state, then checks its
/// exit status.
///
/// A status text without a `job_state` line is logged and polling goes on;
/// with no timeout configured a job that vanishes from the queue keeps this
/// loop alive until cancelled.
pub async fn monitor_job(
    scheduler: &dyn Scheduler,
    job: &JobId,
    cfg: &MonitorConfig,
    cancel: &CancelToken,
) -> Result<(), RunError> {
    let started = Instant::now();
    let cancelled = || RunError::Cancelled {
        job_id: job.to_string(),
    };

    if cancel.sleep(Duration::from_secs(cfg.initial_delay_secs)).await {
        return Err(cancelled());
    }

    loop {
        let out = scheduler.status(job).await?;
        let state = match_regex(JOB_STATE_RE, &out);
        match &state {
            Some(s) => {
                tracing::debug!(event = "job_state", job = %job, state = %s);
                println!("Job state found: {s}");
            }
            None => {
                tracing::warn!(event = "job_state_missing", job = %job);
                println!("Job state not found");
            }
        }
        if state.as_deref().is_some_and(|s| s.contains('E')) {
            break;
        }

        if let Some(limit) = cfg.timeout_secs {
            if started.elapsed() >= Duration::from_secs(limit) {
                tracing::error!(event = "job_wait_timeout", job = %job, limit);
                return Err(RunError::Timeout {
                    job_id: job.to_string(),
                    waited_secs: started.elapsed().as_secs(),
                });
            }
        }

        if cancel.sleep(Duration::from_secs(cfg.poll_interval_secs)).await {
            return Err(cancelled());
        }
    }

    let out = scheduler.status(job).await?;
    match match_regex(EXIT_STATUS_RE, &out) {
        Some(status) if status.trim() == "0" => {
            tracing::info!(event = "job_completed", job = %job);
            println!("Successfully completed job {job}");
            Ok(())
        }
        Some(status) => {
            tracing::error!(event = "job_failed", job = %job, status = %status);
            Err(RunError::JobFailed {
                job_id: job.to_string(),
                status,
            })
        }
        None => {
            tracing::error!(event = "exit_status_missing", job = %job);
            Err(RunError::ExitStatusMissing {
                job_id: job.to_string(),
            })
        }
    }
}
