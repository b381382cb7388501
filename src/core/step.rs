//! Step definitions and operator kinds

use crate::core::error::CompileError;
use serde::{Deserialize, Serialize};

/// A step as written in the YAML `steps` mapping, before resolution
#[derive(Debug, Clone, Deserialize)]
pub struct RawStep {
    /// Operator family: `bash`, `dbt`, or `wait_for_dag`
    pub operator: String,

    /// Disabled steps are dropped entirely at compile time
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Comma-separated names of steps that must run first
    #[serde(default)]
    pub dependency: Option<String>,

    #[serde(default)]
    pub bash_file: Option<String>,

    #[serde(default)]
    pub bash_script: Option<String>,

    #[serde(default)]
    pub dbt_job_id: Option<u64>,

    #[serde(default)]
    pub dbt_job_name: Option<String>,

    #[serde(default)]
    pub dag_name: Option<String>,
}

fn default_enabled() -> bool {
    true
}

/// Resolved operator kind, one per step
///
/// Exactly one operator/parameter combination must match; anything else is
/// rejected at compile time rather than silently skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperatorKind {
    /// Shell command read from a file (path goes through variable substitution)
    BashFile { file: String },

    /// Inline shell command
    BashScript { script: String },

    /// Remote dbt job triggered by numeric id
    DbtJobId { job_id: u64 },

    /// Remote dbt job resolved by name at execution time
    DbtJobName { job_name: String },

    /// Wait for another DAG to complete
    WaitForDag { dag_id: String },
}

impl OperatorKind {
    /// Resolve a raw step into its operator kind
    pub fn resolve(step: &str, raw: &RawStep) -> Result<Self, CompileError> {
        let kind = match (raw.operator.as_str(), raw) {
            (
                "bash",
                RawStep {
                    bash_file: Some(file),
                    bash_script: None,
                    ..
                },
            ) => OperatorKind::BashFile { file: file.clone() },
            (
                "bash",
                RawStep {
                    bash_script: Some(script),
                    bash_file: None,
                    ..
                },
            ) => OperatorKind::BashScript {
                script: script.clone(),
            },
            (
                "dbt",
                RawStep {
                    dbt_job_id: Some(job_id),
                    dbt_job_name: None,
                    ..
                },
            ) => OperatorKind::DbtJobId { job_id: *job_id },
            (
                "dbt",
                RawStep {
                    dbt_job_name: Some(job_name),
                    dbt_job_id: None,
                    ..
                },
            ) => OperatorKind::DbtJobName {
                job_name: job_name.clone(),
            },
            (
                "wait_for_dag",
                RawStep {
                    dag_name: Some(dag_id),
                    ..
                },
            ) => OperatorKind::WaitForDag {
                dag_id: dag_id.clone(),
            },
            _ => {
                return Err(CompileError::InvalidOperator {
                    step: step.to_string(),
                    operator: raw.operator.clone(),
                })
            }
        };
        Ok(kind)
    }
}

/// A compiled step: named, sequenced, with resolved operator and dependencies
///
/// Immutable once compiled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepDefinition {
    /// Unique step name (the YAML mapping key)
    pub name: String,

    /// Sequence index over enabled steps, contiguous from 0 in declaration order
    pub seq: usize,

    pub operator: OperatorKind,

    /// Names of steps that must complete before this one (AND-predecessors)
    pub dependencies: Vec<String>,
}

impl StepDefinition {
    /// Build a definition from a raw step at the given sequence index
    pub fn from_raw(name: &str, seq: usize, raw: &RawStep) -> Result<Self, CompileError> {
        let operator = OperatorKind::resolve(name, raw)?;

        let dependencies = raw
            .dependency
            .as_deref()
            .map(|list| {
                list.split(',')
                    .map(|d| d.trim().to_string())
                    .filter(|d| !d.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            name: name.to_string(),
            seq,
            operator,
            dependencies,
        })
    }
}
