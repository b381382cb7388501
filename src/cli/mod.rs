//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{ListJobsCommand, PlanCommand, RunJobCommand, ValidateCommand};

/// Step-config compiler and remote job driver
#[derive(Debug, Parser, Clone)]
#[command(name = "dagsmith")]
#[command(version = "0.1.0")]
#[command(
    about = "Compiles declarative step configs into task plans and drives remote dbt jobs",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Compile a config and print the resulting task plan
    Plan(PlanCommand),

    /// Validate a DAG configuration
    Validate(ValidateCommand),

    /// Trigger a remote job and poll it to completion
    RunJob(RunJobCommand),

    /// List the account's active remote jobs
    ListJobs(ListJobsCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

use std::ffi::OsString;
