//! dagsmith - compiles declarative step configs into task plans

pub mod cli;
pub mod core;
pub mod remote;
pub mod tasks;

// Re-export commonly used types
pub use core::{
    CompileError, DagConfig, DagSettings, DefaultArgs, OperatorKind, StepDefinition, StepGraph,
    VariableSource, VariableStore, WatcherSettings,
};
pub use remote::{
    Credentials, DbtCloudClient, JobError, JobRunner, JobSelector, JobService, JobSummary,
    PollOptions, RunOutcome, RunState, RunStatus,
};
pub use tasks::{BuildError, Task, TaskEdge, TaskFactory, TaskKind, TaskPlan};
