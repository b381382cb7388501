//! Remote job service client
//!
//! Talks to a dbt Cloud style job-execution API: trigger a job, poll its run
//! until a terminal status, classify the outcome. The [`JobService`] trait is
//! the seam between the polling logic and the HTTP client, which also allows
//! scripted implementations in tests.

pub mod client;
pub mod runner;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::{Credentials, DbtCloudClient, DEFAULT_HOST};
pub use runner::{JobRunner, PollOptions, RunOutcome};

/// Job list rows with this state are runnable
pub const ACTIVE_JOB_STATE: i64 = 1;

/// Errors from the remote job service and its polling loop
#[derive(Debug, Error)]
pub enum JobError {
    /// Raised at construction time, before any network call
    #[error("missing {0} as environment variable")]
    MissingCredential(&'static str),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remote API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("unable to find job name: {0}")]
    UnknownJob(String),

    /// Terminal failure or cancellation reported by the service
    #[error("job run {run_id} failed with status {code}: {message}")]
    RunFailed {
        run_id: u64,
        code: i64,
        message: String,
    },

    /// Terminal status outside the documented code set
    #[error("job run {run_id} reported unexpected status {code}: {message}")]
    UnexpectedStatus {
        run_id: u64,
        code: i64,
        message: String,
    },

    #[error("job run {run_id} exceeded the polling deadline")]
    DeadlineExceeded { run_id: u64 },

    #[error("polling cancelled for job run {run_id}")]
    Cancelled { run_id: u64 },
}

/// Which job to run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobSelector {
    Id(u64),
    Name(String),
}

impl JobSelector {
    /// Numeric input selects by id, anything else by name
    pub fn parse(input: &str) -> Self {
        match input.parse::<u64>() {
            Ok(id) => JobSelector::Id(id),
            Err(_) => JobSelector::Name(input.to_string()),
        }
    }
}

impl std::fmt::Display for JobSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobSelector::Id(id) => write!(f, "#{}", id),
            JobSelector::Name(name) => write!(f, "{}", name),
        }
    }
}

/// One run's status snapshot as reported by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStatus {
    pub code: i64,
    pub message: String,
}

impl RunStatus {
    pub fn state(&self) -> RunState {
        RunState::from_code(self.code)
    }
}

/// Classified run states
///
/// Queued, Starting and Running are pending; everything else terminates the
/// polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Queued,
    Starting,
    Running,
    Success,
    Error,
    Cancelled,
    /// A code outside the documented set
    Unknown,
}

impl RunState {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => RunState::Queued,
            2 => RunState::Starting,
            3 => RunState::Running,
            10 => RunState::Success,
            20 => RunState::Error,
            30 => RunState::Cancelled,
            _ => RunState::Unknown,
        }
    }

    pub fn is_pending(self) -> bool {
        matches!(self, RunState::Queued | RunState::Starting | RunState::Running)
    }
}

/// A job row from the account's job list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: u64,
    pub name: String,
    pub state: i64,
}

/// Remote job service operations
///
/// Implemented by [`DbtCloudClient`] over HTTP and by scripted mocks in tests.
#[async_trait]
pub trait JobService: Send + Sync {
    /// Trigger a job run, returning the new run id
    async fn trigger_job(&self, job_id: u64, cause: &str) -> Result<u64, JobError>;

    /// Fetch the current status of a run
    async fn run_status(&self, run_id: u64) -> Result<RunStatus, JobError>;

    /// Fetch all jobs for the account
    async fn list_jobs(&self) -> Result<Vec<JobSummary>, JobError>;
}
