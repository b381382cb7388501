//! Step graph compilation and dependency resolution

use crate::core::error::CompileError;
use crate::core::step::{RawStep, StepDefinition};
use serde::Serialize;
use serde_yaml::Mapping;
use std::collections::{HashMap, VecDeque};

/// A directed dependency edge: `from` must complete before `to` starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

/// The compiled step graph
///
/// Enabled steps in declaration order (sequence indices are their positions)
/// plus the directed edge set resolved from `dependency` lists. Edges only
/// reference enabled steps and the graph is guaranteed acyclic.
#[derive(Debug, Clone, Serialize)]
pub struct StepGraph {
    steps: Vec<StepDefinition>,
    edges: Vec<Edge>,
}

impl StepGraph {
    /// Compile a raw step mapping into a validated graph
    ///
    /// Two phases: filter the mapping down to enabled steps preserving
    /// declaration order, then assign sequence indices over that subset and
    /// resolve dependency names into edges. A reference to a disabled or
    /// nonexistent step fails compilation, as does a dependency cycle.
    pub fn compile(steps: &Mapping) -> Result<Self, CompileError> {
        if steps.is_empty() {
            return Err(CompileError::MissingSteps);
        }

        // Phase 1: enabled subset, declaration order intact
        let mut enabled: Vec<(String, RawStep)> = Vec::new();
        for (key, value) in steps {
            let name = key
                .as_str()
                .ok_or(CompileError::NonStringStepName)?
                .to_string();
            let raw: RawStep =
                serde_yaml::from_value(value.clone()).map_err(|source| {
                    CompileError::MalformedStep {
                        step: name.clone(),
                        source,
                    }
                })?;
            if raw.enabled {
                enabled.push((name, raw));
            }
        }

        // Phase 2: sequence indices over the survivors only
        let definitions = enabled
            .iter()
            .enumerate()
            .map(|(seq, (name, raw))| StepDefinition::from_raw(name, seq, raw))
            .collect::<Result<Vec<_>, _>>()?;

        let index: HashMap<&str, usize> = definitions
            .iter()
            .map(|step| (step.name.as_str(), step.seq))
            .collect();

        let mut edges = Vec::new();
        for step in &definitions {
            for dependency in &step.dependencies {
                if !index.contains_key(dependency.as_str()) {
                    return Err(CompileError::UnknownDependency {
                        step: step.name.clone(),
                        dependency: dependency.clone(),
                    });
                }
                edges.push(Edge {
                    from: dependency.clone(),
                    to: step.name.clone(),
                });
            }
        }

        let graph = Self {
            steps: definitions,
            edges,
        };
        graph.topological_order()?;
        Ok(graph)
    }

    /// Enabled steps in sequence order
    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    /// Resolved dependency edges (dependency -> dependent)
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Look up a step's sequence index by name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.name == name)
    }

    /// Look up a step by name
    pub fn step(&self, name: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Step names in a valid execution order (Kahn's algorithm)
    ///
    /// Ties are broken by sequence index, so independent steps keep their
    /// declaration order.
    pub fn topological_order(&self) -> Result<Vec<&str>, CompileError> {
        let mut in_degree: Vec<usize> = vec![0; self.steps.len()];
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); self.steps.len()];

        for edge in &self.edges {
            // Edge endpoints were validated during compile
            let from = self.index_of(&edge.from).expect("edge endpoint");
            let to = self.index_of(&edge.to).expect("edge endpoint");
            adjacency[from].push(to);
            in_degree[to] += 1;
        }

        let mut queue: VecDeque<usize> = (0..self.steps.len())
            .filter(|&i| in_degree[i] == 0)
            .collect();

        let mut sorted = Vec::with_capacity(self.steps.len());
        while let Some(i) = queue.pop_front() {
            sorted.push(self.steps[i].name.as_str());
            for &next in &adjacency[i] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        if sorted.len() != self.steps.len() {
            let stuck = self
                .steps
                .iter()
                .find(|s| !sorted.contains(&s.name.as_str()))
                .map(|s| s.name.clone())
                .unwrap_or_default();
            return Err(CompileError::DependencyCycle(stuck));
        }

        Ok(sorted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::DagConfig;
    use crate::core::step::OperatorKind;

    fn compile(yaml: &str) -> Result<StepGraph, CompileError> {
        DagConfig::from_yaml(yaml).unwrap().compile()
    }

    #[test]
    fn test_disabled_step_dropped_without_gap() {
        let graph = compile(
            r#"
steps:
  extract:
    operator: bash
    bash_script: "run extract"
  stage:
    operator: bash
    bash_script: "run stage"
    enabled: false
  load:
    operator: bash
    bash_script: "run load"
"#,
        )
        .unwrap();

        let names: Vec<_> = graph.steps().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["extract", "load"]);
        assert_eq!(graph.step("extract").unwrap().seq, 0);
        assert_eq!(graph.step("load").unwrap().seq, 1);
        assert!(graph.step("stage").is_none());
    }

    #[test]
    fn test_sequence_indices_contiguous_in_declaration_order() {
        let graph = compile(
            r#"
steps:
  a:
    operator: bash
    bash_script: "a"
  b:
    operator: bash
    bash_script: "b"
  c:
    operator: bash
    bash_script: "c"
"#,
        )
        .unwrap();

        let seqs: Vec<_> = graph.steps().iter().map(|s| s.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[test]
    fn test_multi_dependency_edges() {
        let graph = compile(
            r#"
steps:
  b:
    operator: bash
    bash_script: "b"
  c:
    operator: bash
    bash_script: "c"
  a:
    operator: bash
    bash_script: "a"
    dependency: "b,c"
"#,
        )
        .unwrap();

        assert_eq!(
            graph.edges(),
            &[
                Edge {
                    from: "b".to_string(),
                    to: "a".to_string()
                },
                Edge {
                    from: "c".to_string(),
                    to: "a".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_dependency_on_disabled_step_fails() {
        let err = compile(
            r#"
steps:
  stage:
    operator: bash
    bash_script: "stage"
    enabled: false
  load:
    operator: bash
    bash_script: "load"
    dependency: "stage"
"#,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            CompileError::UnknownDependency { step, dependency }
                if step == "load" && dependency == "stage"
        ));
    }

    #[test]
    fn test_dependency_on_nonexistent_step_fails() {
        let err = compile(
            r#"
steps:
  load:
    operator: bash
    bash_script: "load"
    dependency: "no_such_step"
"#,
        )
        .unwrap_err();

        assert!(matches!(err, CompileError::UnknownDependency { .. }));
    }

    #[test]
    fn test_empty_steps_fails() {
        assert!(matches!(
            compile("steps: {}"),
            Err(CompileError::MissingSteps)
        ));
    }

    #[test]
    fn test_cycle_detected() {
        let err = compile(
            r#"
steps:
  a:
    operator: bash
    bash_script: "a"
    dependency: "b"
  b:
    operator: bash
    bash_script: "b"
    dependency: "a"
"#,
        )
        .unwrap_err();

        assert!(matches!(err, CompileError::DependencyCycle(_)));
    }

    #[test]
    fn test_unrecognized_operator_fails_compile() {
        let err = compile(
            r#"
steps:
  weird:
    operator: spark
    bash_script: "x"
"#,
        )
        .unwrap_err();

        assert!(matches!(err, CompileError::InvalidOperator { .. }));
    }

    #[test]
    fn test_topological_order_respects_dependencies() {
        let graph = compile(
            r#"
steps:
  report:
    operator: bash
    bash_script: "report"
    dependency: "transform"
  extract:
    operator: bash
    bash_script: "extract"
  transform:
    operator: dbt
    dbt_job_id: 7
    dependency: "extract"
"#,
        )
        .unwrap();

        let order = graph.topological_order().unwrap();
        let pos = |name: &str| order.iter().position(|n| *n == name).unwrap();
        assert!(pos("extract") < pos("transform"));
        assert!(pos("transform") < pos("report"));

        assert_eq!(
            graph.step("transform").unwrap().operator,
            OperatorKind::DbtJobId { job_id: 7 }
        );
    }
}
