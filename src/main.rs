mod cli;
mod core;
mod remote;
mod tasks;

use anyhow::{Context, Result};
use cli::commands::{ListJobsCommand, PlanCommand, RunJobCommand, ValidateCommand};
use cli::output::*;
use cli::{Cli, Command};
use core::{DagConfig, VariableSource, VariableStore, YamlFileVariables};
use remote::{
    Credentials, DbtCloudClient, JobRunner, JobSelector, JobService, PollOptions, ACTIVE_JOB_STATE,
};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tasks::TaskFactory;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Plan(cmd) => plan(cmd)?,
        Command::Validate(cmd) => validate(cmd)?,
        Command::RunJob(cmd) => run_job(cmd).await?,
        Command::ListJobs(cmd) => list_jobs(cmd).await?,
    }

    Ok(())
}

/// Explicit dag id, or the config file's stem
fn dag_id_for(file: &str, explicit: Option<&String>) -> String {
    explicit.cloned().unwrap_or_else(|| {
        Path::new(file)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("dag")
            .to_string()
    })
}

/// Build the substitution context: vars file first, then --var overrides
fn load_variables(cmd: &PlanCommand) -> Result<VariableStore> {
    let mut vars = match &cmd.vars_file {
        Some(path) => YamlFileVariables::new(path)
            .load()
            .context("Failed to load variables file")?,
        None => HashMap::new(),
    };

    for (key, value) in &cmd.variable {
        vars.insert(key.clone(), value.clone());
    }

    Ok(VariableStore::new(vars))
}

fn plan(cmd: &PlanCommand) -> Result<()> {
    let config = DagConfig::from_file(&cmd.file).context("Failed to load DAG config")?;
    let dag_id = dag_id_for(&cmd.file, cmd.dag_id.as_ref());

    let settings = config.settings(&dag_id)?;
    let graph = config.compile()?;
    let variables = load_variables(cmd)?;

    let factory = TaskFactory::new(&variables);
    let plan = factory.build(settings, config.watcher(), &graph)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        println!("{}", format_plan(&plan));
    }

    Ok(())
}

fn validate(cmd: &ValidateCommand) -> Result<()> {
    let config = DagConfig::from_file(&cmd.file).context("Failed to load DAG config")?;
    let dag_id = dag_id_for(&cmd.file, cmd.dag_id.as_ref());

    let settings = config.settings(&dag_id)?;
    let graph = config.compile()?;
    let order = graph.topological_order()?;

    println!(
        "{} {} is valid: {} steps, {} edges",
        CHECK,
        style(&settings.dag_id).bold(),
        graph.len(),
        graph.edges().len()
    );
    println!("{} execution order: {}", INFO, order.join(" -> "));

    Ok(())
}

async fn run_job(cmd: &RunJobCommand) -> Result<()> {
    let selector = JobSelector::parse(&cmd.job);
    let options = PollOptions {
        interval: Duration::from_secs(cmd.interval_secs),
        deadline: cmd.timeout_secs.map(Duration::from_secs),
    };

    let runner = JobRunner::from_env()
        .context("Failed to build remote job client")?
        .with_options(options);

    println!("{} Running remote job {}", ROCKET, style(&cmd.job).bold());
    let outcome = runner.run(selector).await?;

    println!(
        "{} Run {} finished: {}",
        CHECK,
        outcome.run_id,
        style(&outcome.message).green()
    );

    Ok(())
}

async fn list_jobs(cmd: &ListJobsCommand) -> Result<()> {
    let client = DbtCloudClient::new(
        Credentials::from_env().context("Failed to build remote job client")?,
    );

    let jobs = client.list_jobs().await?;
    let active: Vec<_> = jobs
        .into_iter()
        .filter(|j| j.state == ACTIVE_JOB_STATE)
        .collect();

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&active)?);
    } else {
        for job in &active {
            println!("{} {} {}", INFO, style(job.id).bold(), job.name);
        }
    }

    Ok(())
}
