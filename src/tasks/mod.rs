//! Task plan assembly
//!
//! Converts a compiled [`StepGraph`] into the task descriptors and ordering
//! constraints handed to the host orchestration engine. The engine owns
//! scheduling, retries and notifications; the plan only carries them.

use crate::core::{DagSettings, OperatorKind, StepGraph, VariableStore, WatcherSettings};
use crate::remote::JobSelector;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Seconds the host engine should spend checking that a wait target exists
pub const WAIT_FOR_DAG_TIMEOUT_SECS: u64 = 120;

/// Errors building tasks from a compiled graph
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("step '{step}': failed to read bash file '{path}': {source}")]
    ScriptRead {
        step: String,
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// What a task does, mapped one-to-one from the step's operator kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskKind {
    /// Shell command executed by the host engine
    Shell { command: String },

    /// Remote job driven by a [`crate::remote::JobRunner`] at execution time
    RemoteJob { job: JobSelector },

    /// Wait for a whole external DAG to complete, not a specific sub-task
    WaitForDag {
        external_dag_id: String,
        timeout_secs: u64,
        check_existence: bool,
    },
}

/// One executable task, keyed by its step name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: String,

    #[serde(flatten)]
    pub kind: TaskKind,
}

/// Ordering constraint between two tasks, as indices into the task list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskEdge {
    pub upstream: usize,
    pub downstream: usize,
}

/// The submission payload for the host engine
#[derive(Debug, Clone, Serialize)]
pub struct TaskPlan {
    pub plan_id: Uuid,
    pub compiled_at: DateTime<Utc>,
    pub dag: DagSettings,
    pub watcher: WatcherSettings,
    pub tasks: Vec<Task>,
    pub edges: Vec<TaskEdge>,
}

/// Builds tasks from compiled steps, substituting variables where needed
pub struct TaskFactory<'a> {
    variables: &'a VariableStore,
}

impl<'a> TaskFactory<'a> {
    pub fn new(variables: &'a VariableStore) -> Self {
        Self { variables }
    }

    /// Map every step to a task, then translate the compiler's name edges
    /// into index pairs over the task list
    pub fn build(
        &self,
        dag: DagSettings,
        watcher: WatcherSettings,
        graph: &StepGraph,
    ) -> Result<TaskPlan, BuildError> {
        let mut tasks = Vec::with_capacity(graph.len());
        for step in graph.steps() {
            let kind = match &step.operator {
                OperatorKind::BashFile { file } => {
                    // The path goes through substitution; the file contents
                    // are used verbatim.
                    let path = self.variables.substitute(file);
                    let command = std::fs::read_to_string(&path).map_err(|source| {
                        BuildError::ScriptRead {
                            step: step.name.clone(),
                            path: path.clone(),
                            source,
                        }
                    })?;
                    TaskKind::Shell { command }
                }
                OperatorKind::BashScript { script } => TaskKind::Shell {
                    command: script.clone(),
                },
                OperatorKind::DbtJobId { job_id } => TaskKind::RemoteJob {
                    job: JobSelector::Id(*job_id),
                },
                OperatorKind::DbtJobName { job_name } => TaskKind::RemoteJob {
                    job: JobSelector::Name(job_name.clone()),
                },
                OperatorKind::WaitForDag { dag_id } => TaskKind::WaitForDag {
                    external_dag_id: dag_id.clone(),
                    timeout_secs: WAIT_FOR_DAG_TIMEOUT_SECS,
                    check_existence: true,
                },
            };
            tasks.push(Task {
                id: step.name.clone(),
                kind,
            });
        }

        let edges = graph
            .edges()
            .iter()
            .map(|edge| TaskEdge {
                // Endpoints were validated at compile time
                upstream: graph.index_of(&edge.from).expect("validated edge"),
                downstream: graph.index_of(&edge.to).expect("validated edge"),
            })
            .collect();

        Ok(TaskPlan {
            plan_id: Uuid::new_v4(),
            compiled_at: Utc::now(),
            dag,
            watcher,
            tasks,
            edges,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DagConfig;
    use std::collections::HashMap;

    fn settings() -> DagSettings {
        DagConfig::from_yaml("config:\n  owner: o\n  description: d\n")
            .unwrap()
            .settings("test_dag")
            .unwrap()
    }

    fn vars(pairs: &[(&str, &str)]) -> VariableStore {
        VariableStore::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_build_maps_every_operator_kind() {
        let script_path = "/tmp/dagsmith_test_build.sh";
        std::fs::write(script_path, "echo from-file\n").unwrap();

        let yaml = r#"
steps:
  from_file:
    operator: bash
    bash_file: "{{ var.value.SCRIPTS }}/dagsmith_test_build.sh"
  inline:
    operator: bash
    bash_script: "echo inline"
  by_id:
    operator: dbt
    dbt_job_id: 42
  by_name:
    operator: dbt
    dbt_job_name: "daily_build"
  upstream_dag:
    operator: wait_for_dag
    dag_name: "warehouse_load"
"#;

        let graph = DagConfig::from_yaml(yaml).unwrap().compile().unwrap();
        let store = vars(&[("SCRIPTS", "/tmp")]);
        let plan = TaskFactory::new(&store)
            .build(settings(), WatcherSettings::default(), &graph)
            .unwrap();

        assert_eq!(plan.tasks.len(), 5);
        assert_eq!(
            plan.tasks[0].kind,
            TaskKind::Shell {
                command: "echo from-file\n".to_string()
            }
        );
        assert_eq!(
            plan.tasks[1].kind,
            TaskKind::Shell {
                command: "echo inline".to_string()
            }
        );
        assert_eq!(
            plan.tasks[2].kind,
            TaskKind::RemoteJob {
                job: JobSelector::Id(42)
            }
        );
        assert_eq!(
            plan.tasks[3].kind,
            TaskKind::RemoteJob {
                job: JobSelector::Name("daily_build".to_string())
            }
        );
        assert_eq!(
            plan.tasks[4].kind,
            TaskKind::WaitForDag {
                external_dag_id: "warehouse_load".to_string(),
                timeout_secs: 120,
                check_existence: true,
            }
        );

        std::fs::remove_file(script_path).ok();
    }

    #[test]
    fn test_edges_translated_to_index_pairs() {
        let yaml = r#"
steps:
  extract:
    operator: bash
    bash_script: "extract"
  load:
    operator: bash
    bash_script: "load"
  report:
    operator: bash
    bash_script: "report"
    dependency: "extract,load"
"#;

        let graph = DagConfig::from_yaml(yaml).unwrap().compile().unwrap();
        let store = VariableStore::empty();
        let plan = TaskFactory::new(&store)
            .build(settings(), WatcherSettings::default(), &graph)
            .unwrap();

        assert_eq!(
            plan.edges,
            vec![
                TaskEdge {
                    upstream: 0,
                    downstream: 2
                },
                TaskEdge {
                    upstream: 1,
                    downstream: 2
                },
            ]
        );
    }

    #[test]
    fn test_missing_bash_file_fails() {
        let yaml = r#"
steps:
  broken:
    operator: bash
    bash_file: "/tmp/dagsmith_does_not_exist_12345.sh"
"#;

        let graph = DagConfig::from_yaml(yaml).unwrap().compile().unwrap();
        let store = VariableStore::new(HashMap::new());
        let err = TaskFactory::new(&store)
            .build(settings(), WatcherSettings::default(), &graph)
            .unwrap_err();

        assert!(matches!(
            err,
            BuildError::ScriptRead { step, .. } if step == "broken"
        ));
    }
}
