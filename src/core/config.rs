//! DAG configuration from YAML

use crate::core::error::CompileError;
use crate::core::graph::StepGraph;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::path::Path;

/// Top-level DAG configuration document
///
/// Three sections: `config` (DAG-level settings), `watcher` (carried for the
/// host-side watcher, never interpreted here), and `steps` (the step mapping
/// compiled into a [`StepGraph`]).
#[derive(Debug, Clone, Deserialize)]
pub struct DagConfig {
    #[serde(default)]
    config: Option<ConfigSection>,

    #[serde(default)]
    watcher: Option<WatcherSettings>,

    /// Raw step mapping, kept as YAML to preserve declaration order
    #[serde(default)]
    steps: Option<Mapping>,
}

/// The `config` section as written in YAML
///
/// Any extra key naming a recognized default argument overrides it.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    #[serde(default)]
    pub owner: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub schedule_interval: Option<String>,

    #[serde(flatten)]
    pub overrides: HashMap<String, Value>,
}

/// Watcher settings - parsed and carried in the plan, unused by the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherSettings {
    /// Sleep between watcher polls, in minutes
    #[serde(default = "default_sleep_time")]
    pub sleep_time: u64,

    /// Number of watcher retries before giving up
    #[serde(default = "default_max_retry")]
    pub max_retry: u32,
}

fn default_sleep_time() -> u64 {
    30
}

fn default_max_retry() -> u32 {
    3
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            sleep_time: default_sleep_time(),
            max_retry: default_max_retry(),
        }
    }
}

/// Resolved DAG-level settings handed to the host engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DagSettings {
    pub dag_id: String,
    pub owner: String,
    pub description: String,
    pub schedule_interval: String,

    /// Start date offset, in days before now
    pub start_days_ago: u32,

    pub default_args: DefaultArgs,
}

/// Default arguments applied to every task by the host engine
///
/// The core only carries these; retries and notifications are the engine's
/// concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultArgs {
    pub owner: String,
    pub depends_on_past: bool,
    pub email: Vec<String>,
    pub email_on_failure: bool,
    pub email_on_retry: bool,
    pub retries: u32,
    pub retry_delay_minutes: u64,
}

impl DefaultArgs {
    fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            depends_on_past: false,
            email: Vec::new(),
            email_on_failure: true,
            email_on_retry: true,
            retries: 1,
            retry_delay_minutes: 5,
        }
    }

    /// Apply a single `config` override if `key` names a known argument
    ///
    /// Returns an error when a recognized key carries a value of the wrong
    /// type; unrecognized keys are left for other consumers.
    fn apply(&mut self, key: &str, value: &Value) -> Result<(), CompileError> {
        let invalid = || CompileError::InvalidConfigValue {
            key: key.to_string(),
        };

        match key {
            "depends_on_past" => self.depends_on_past = value.as_bool().ok_or_else(invalid)?,
            "email_on_failure" => self.email_on_failure = value.as_bool().ok_or_else(invalid)?,
            "email_on_retry" => self.email_on_retry = value.as_bool().ok_or_else(invalid)?,
            "retries" => {
                self.retries = value
                    .as_u64()
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(invalid)?
            }
            "retry_delay_minutes" => {
                self.retry_delay_minutes = value.as_u64().ok_or_else(invalid)?
            }
            "email" => {
                self.email = match value {
                    Value::String(addr) => vec![addr.clone()],
                    Value::Sequence(seq) => seq
                        .iter()
                        .map(|v| v.as_str().map(str::to_string).ok_or_else(invalid))
                        .collect::<Result<_, _>>()?,
                    _ => return Err(invalid()),
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl DagConfig {
    /// Load a DAG configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CompileError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a DAG configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, CompileError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Resolve the `config` section into [`DagSettings`]
    ///
    /// Fails when the section, the owner, or the description is missing.
    pub fn settings(&self, dag_id: &str) -> Result<DagSettings, CompileError> {
        let section = self.config.as_ref().ok_or(CompileError::MissingConfig)?;
        let owner = section.owner.as_deref().ok_or(CompileError::MissingOwner)?;
        let description = section
            .description
            .as_deref()
            .ok_or(CompileError::MissingDescription)?;

        let mut default_args = DefaultArgs::new(owner);
        for (key, value) in &section.overrides {
            default_args.apply(key, value)?;
        }

        Ok(DagSettings {
            dag_id: dag_id.to_string(),
            owner: owner.to_string(),
            description: description.to_string(),
            schedule_interval: section
                .schedule_interval
                .clone()
                .unwrap_or_else(|| "@daily".to_string()),
            start_days_ago: 1,
            default_args,
        })
    }

    /// Watcher settings, defaulted when the section is absent
    pub fn watcher(&self) -> WatcherSettings {
        self.watcher.unwrap_or_default()
    }

    /// The raw step mapping, if any
    pub fn steps(&self) -> Option<&Mapping> {
        self.steps.as_ref()
    }

    /// Compile the `steps` section into a [`StepGraph`]
    pub fn compile(&self) -> Result<StepGraph, CompileError> {
        let steps = self.steps.as_ref().ok_or(CompileError::MissingSteps)?;
        StepGraph::compile(steps)
    }
}
