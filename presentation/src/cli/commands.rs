//! CLI command definitions.

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for `status`.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum StatusOutputFormat {
    Text,
    Json,
}

/// Top-level CLI arguments for conduct.
#[derive(Parser, Debug)]
#[command(name = "conduct")]
#[command(author, version, about = "Deterministic multi-agent orchestration engine")]
#[command(long_about = r#"
conduct drives a manifest of components through implementation, validation,
and voting-gated phases using one or more agent subprocesses.

Example:
  conduct run --spec myproject/auth
  conduct status --spec myproject/auth --output json
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to an explicit config file, taking priority over project/global config
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<std::path::PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a manifest from the beginning.
    Run {
        /// Spec reference as `project/name`, or a full path to the spec directory.
        #[arg(long)]
        spec: String,
        /// Discard any existing state and start a fresh run.
        #[arg(long)]
        fresh: bool,
    },
    /// Resume a previously started run from its last saved state.
    Resume {
        #[arg(long)]
        spec: String,
    },
    /// Print a summary of a run's current state.
    Status {
        #[arg(long)]
        spec: String,
        #[arg(short, long, value_enum, default_value = "text")]
        output: StatusOutputFormat,
    },
    /// Validate a manifest without running it.
    Validate {
        #[arg(long)]
        spec: String,
    },
    /// Create a new spec directory scaffold.
    New {
        #[arg(long)]
        project: String,
        #[arg(long)]
        name: String,
    },
    /// List specs, optionally scoped to one project.
    List {
        #[arg(long)]
        project: Option<String>,
    },
}
