//! CLI command definitions

use clap::Args;

/// Compile a config and print the resulting task plan
#[derive(Debug, Args, Clone)]
pub struct PlanCommand {
    /// Path to DAG YAML file
    #[arg(short, long)]
    pub file: String,

    /// DAG id for the plan (defaults to the file stem)
    #[arg(long)]
    pub dag_id: Option<String>,

    /// YAML file with substitution variables (flat string map)
    #[arg(long)]
    pub vars_file: Option<String>,

    /// Variable overrides (key=value)
    #[arg(long = "var", value_parser = parse_key_value)]
    pub variable: Vec<(String, String)>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Validate a DAG configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to DAG YAML file
    #[arg(short, long)]
    pub file: String,

    /// DAG id used while validating (defaults to the file stem)
    #[arg(long)]
    pub dag_id: Option<String>,
}

/// List the account's active remote jobs
#[derive(Debug, Args, Clone)]
pub struct ListJobsCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Trigger a remote job and poll until a terminal status
#[derive(Debug, Args, Clone)]
pub struct RunJobCommand {
    /// Job id or exact job name
    #[arg(short, long)]
    pub job: String,

    /// Seconds between status checks
    #[arg(long, default_value_t = 10)]
    pub interval_secs: u64,

    /// Overall deadline in seconds (unbounded when omitted)
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 {
        return Err(format!("Invalid key=value pair: {}", s));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("ENV=prod").unwrap(),
            ("ENV".to_string(), "prod".to_string())
        );
        assert_eq!(
            parse_key_value("PATH=/a=b").unwrap(),
            ("PATH".to_string(), "/a=b".to_string())
        );
        assert!(parse_key_value("no-equals").is_err());
    }
}
