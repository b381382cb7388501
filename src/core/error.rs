//! Compile-time error types

use thiserror::Error;

/// Errors raised while parsing and compiling a DAG configuration
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("missing `config` section")]
    MissingConfig,

    #[error("missing DAG owner in `config`")]
    MissingOwner,

    #[error("missing DAG description in `config`")]
    MissingDescription,

    #[error("`config.{key}` has an invalid value")]
    InvalidConfigValue { key: String },

    #[error("missing or empty `steps` section")]
    MissingSteps,

    #[error("step names must be strings")]
    NonStringStepName,

    #[error("step '{step}' is malformed: {source}")]
    MalformedStep {
        step: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("step '{step}' has an unrecognized operator/parameter combination (operator: '{operator}')")]
    InvalidOperator { step: String, operator: String },

    #[error("step '{step}' depends on unknown or disabled step '{dependency}'")]
    UnknownDependency { step: String, dependency: String },

    #[error("dependency cycle involving step '{0}'")]
    DependencyCycle(String),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid YAML document: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
