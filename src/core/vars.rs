//! Variable store and substitution

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading variables from a source
#[derive(Debug, Error)]
pub enum VarsError {
    #[error("failed to read variables file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid variables document: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Seam to the host engine's variable registry
///
/// Queried exactly once; the resulting [`VariableStore`] is immutable.
pub trait VariableSource {
    fn load(&self) -> Result<HashMap<String, String>, VarsError>;
}

/// Variables read from a flat YAML map file, the CLI stand-in for the host
/// engine's registry
#[derive(Debug, Clone)]
pub struct YamlFileVariables {
    path: PathBuf,
}

impl YamlFileVariables {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl VariableSource for YamlFileVariables {
    fn load(&self) -> Result<HashMap<String, String>, VarsError> {
        #[derive(Deserialize)]
        struct Doc(HashMap<String, String>);

        let content = std::fs::read_to_string(&self.path)?;
        let Doc(vars) = serde_yaml::from_str(&content)?;
        Ok(vars)
    }
}

/// Immutable substitution context, built once per compile invocation
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    vars: HashMap<String, String>,
}

impl VariableStore {
    pub fn new(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the store by querying a source once
    pub fn from_source(source: &dyn VariableSource) -> Result<Self, VarsError> {
        Ok(Self::new(source.load()?))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Substitute variable tokens into a template
    ///
    /// Every `{{ var.value.<name> }}` token is replaced by the variable's
    /// value, then every remaining `{` and `}` is stripped unconditionally.
    /// An unresolved token therefore collapses to the literal
    /// `var.value.<name>` instead of failing; downstream consumers such as
    /// file paths rely on exactly this.
    pub fn substitute(&self, template: &str) -> String {
        let mut out = template.to_string();
        for (name, value) in &self.vars {
            let token = format!("{{{{ var.value.{} }}}}", name);
            out = out.replace(&token, value);
        }
        out.chars().filter(|&c| c != '{' && c != '}').collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(pairs: &[(&str, &str)]) -> VariableStore {
        VariableStore::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_substitute_known_token() {
        let vars = store(&[("FOO", "bar")]);
        assert_eq!(vars.substitute("{{ var.value.FOO }}"), "bar");
    }

    #[test]
    fn test_unknown_token_collapses_to_literal() {
        let vars = store(&[("FOO", "bar")]);
        assert_eq!(vars.substitute("{{ var.value.BAZ }}"), " var.value.BAZ ");

        // Even with no variables at all, braces are stripped
        assert_eq!(
            VariableStore::empty().substitute("{{ var.value.BAZ }}"),
            " var.value.BAZ "
        );
    }

    #[test]
    fn test_substitute_inside_path() {
        let vars = store(&[("SCRIPTS_DIR", "/opt/jobs")]);
        assert_eq!(
            vars.substitute("{{ var.value.SCRIPTS_DIR }}/load.sh"),
            "/opt/jobs/load.sh"
        );
    }

    #[test]
    fn test_multiple_tokens() {
        let vars = store(&[("A", "1"), ("B", "2")]);
        assert_eq!(
            vars.substitute("{{ var.value.A }}-{{ var.value.B }}"),
            "1-2"
        );
    }

    #[test]
    fn test_stray_braces_stripped() {
        let vars = store(&[("A", "1")]);
        assert_eq!(vars.substitute("a {b} c {{ var.value.A }}"), "a b c 1");
    }
}
