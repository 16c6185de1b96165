//! Turns the appliance's asynchronous task model into a single awaitable result.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{TaskHandle, TaskStatus};
use crate::error::{DeployError, Result};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::transport::{ApiClient, Transport};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How often to poll and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Upper bound on total polling time. `None` polls until the task settles.
    pub deadline: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            deadline: None,
        }
    }
}

impl PollPolicy {
    /// Whether another poll, one interval from now, still falls inside the deadline.
    pub fn allows_next_poll(&self, elapsed: Duration) -> bool {
        match self.deadline {
            Some(deadline) => elapsed + self.interval <= deadline,
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TaskPoller {
    policy: PollPolicy,
}

impl TaskPoller {
    pub fn new(policy: PollPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Poll `handle` until its status leaves `STARTED`.
    ///
    /// A terminal `FAILED` status is returned as data. Transport and HTTP
    /// errors end the loop immediately; only a `STARTED` status is retried.
    pub async fn poll<T, P>(
        &self,
        client: &ApiClient<T>,
        handle: &TaskHandle,
        progress: &P,
        cancel: &CancellationToken,
    ) -> Result<TaskStatus>
    where
        T: Transport,
        P: ProgressSink + ?Sized,
    {
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let status: TaskStatus =
                until_cancelled(cancel, client.get_json(&handle.poll_path)).await?;

            if !status.state.is_pending() {
                tracing::debug!(task = %handle.id, state = %status.state, attempt, "task settled");
                progress.emit(ProgressEvent::TaskFinished {
                    id: handle.id.clone(),
                    state: status.state.clone(),
                    error_message: status.error_message.clone(),
                });
                return Ok(status);
            }

            progress.emit(ProgressEvent::TaskPolled {
                id: handle.id.clone(),
                state: status.state,
                attempt,
            });

            if !self.policy.allows_next_poll(started.elapsed()) {
                let deadline = self.policy.deadline.unwrap_or_default();
                tracing::warn!(task = %handle.id, ?deadline, "task still running at deadline");
                return Err(DeployError::DeadlineExceeded(deadline));
            }

            until_cancelled(cancel, async {
                tokio::time::sleep(self.policy.interval).await;
                Ok(())
            })
            .await?;
        }
    }
}

/// Run `fut` unless `cancel` fires first.
pub(crate) async fn until_cancelled<F, R>(cancel: &CancellationToken, fut: F) -> Result<R>
where
    F: Future<Output = Result<R>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DeployError::Cancelled),
        result = fut => result,
    }
}
