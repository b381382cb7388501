//! Poll-until-terminal job driver

use super::{
    Credentials, DbtCloudClient, JobError, JobSelector, JobService, RunState, RunStatus,
    ACTIVE_JOB_STATE,
};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Cause string attached to triggered runs
const TRIGGER_CAUSE: &str = "Triggered by dagsmith";

/// How the polling loop waits
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Pause between status checks
    pub interval: Duration,

    /// Wall-clock budget for one run; `None` waits indefinitely
    pub deadline: Option<Duration>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            deadline: None,
        }
    }
}

/// Successful terminal outcome of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub run_id: u64,
    pub code: i64,
    pub message: String,
}

/// Drives exactly one remote job run at a time to a terminal status
///
/// The classification is unchanged from the service's documented codes; the
/// deadline and cancellation token only bound how long the caller waits.
pub struct JobRunner<S> {
    service: S,
    options: PollOptions,
    cancel: CancellationToken,
}

impl JobRunner<DbtCloudClient> {
    /// Build a runner from environment credentials
    pub fn from_env() -> Result<Self, JobError> {
        Ok(Self::new(DbtCloudClient::new(Credentials::from_env()?)))
    }
}

impl<S: JobService> JobRunner<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            options: PollOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_options(mut self, options: PollOptions) -> Self {
        self.options = options;
        self
    }

    /// Attach a token that aborts a pending wait when cancelled
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run a job to completion, by id or by name
    pub async fn run(&self, job: JobSelector) -> Result<RunOutcome, JobError> {
        match job {
            JobSelector::Id(id) => self.run_by_id(id).await,
            JobSelector::Name(name) => self.run_by_name(&name).await,
        }
    }

    /// Resolve a job name among the account's active jobs, then run it
    ///
    /// No trigger call is made when the name does not match.
    async fn run_by_name(&self, name: &str) -> Result<RunOutcome, JobError> {
        let jobs = self.service.list_jobs().await?;
        let job = jobs
            .iter()
            .filter(|j| j.state == ACTIVE_JOB_STATE)
            .find(|j| j.name == name)
            .ok_or_else(|| JobError::UnknownJob(name.to_string()))?;
        self.run_by_id(job.id).await
    }

    async fn run_by_id(&self, job_id: u64) -> Result<RunOutcome, JobError> {
        let run_id = self.service.trigger_job(job_id, TRIGGER_CAUSE).await?;
        info!(job_id, run_id, "triggered remote job");

        let status = self.poll(run_id).await?;
        match status.state() {
            RunState::Success => Ok(RunOutcome {
                run_id,
                code: status.code,
                message: status.message,
            }),
            _ if status.code > 10 => Err(JobError::RunFailed {
                run_id,
                code: status.code,
                message: status.message,
            }),
            _ => Err(JobError::UnexpectedStatus {
                run_id,
                code: status.code,
                message: status.message,
            }),
        }
    }

    /// Poll the run until it leaves the pending states
    async fn poll(&self, run_id: u64) -> Result<RunStatus, JobError> {
        let started = Instant::now();
        loop {
            let status = self.service.run_status(run_id).await?;
            info!(run_id, code = status.code, "dbt: {}", status.message);

            if !status.state().is_pending() {
                return Ok(status);
            }

            if let Some(deadline) = self.options.deadline {
                if started.elapsed() + self.options.interval > deadline {
                    return Err(JobError::DeadlineExceeded { run_id });
                }
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(JobError::Cancelled { run_id }),
                _ = sleep(self.options.interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_options_default() {
        let options = PollOptions::default();
        assert_eq!(options.interval, Duration::from_secs(10));
        assert!(options.deadline.is_none());
    }
}
