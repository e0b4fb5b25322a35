//! CLI entrypoint for conduct.
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{bail, Context, Result};
use clap::Parser;
use conduct_application::{RunEngineError, RunEngineUseCase};
use conduct_infrastructure::{ConfigLoader, JsonFileStateStore, JsonlContextStore, SubprocessAgentRunner};
use conduct_presentation::{Cli, Command, ConsoleFormatter, IndicatifProgress, SimpleProgress, StatusOutputFormat};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    info!("starting conduct");

    match cli.command {
        Command::Run { spec, fresh } => run_or_resume(&spec, fresh, cli.quiet, cli.config.as_deref()).await,
        Command::Resume { spec } => run_or_resume(&spec, false, cli.quiet, cli.config.as_deref()).await,
        Command::Status { spec, output } => status(&spec, output).await,
        Command::Validate { spec } => validate(&spec).await,
        Command::New { project, name } => new_spec(&project, &name).await,
        Command::List { project } => list(project.as_deref()).await,
    }
}

/// Load a manifest from its spec directory's `manifest.json`.
fn load_manifest(layout: &conduct_infrastructure::SpecLayout) -> Result<conduct_domain::Manifest> {
    let raw = std::fs::read_to_string(layout.manifest_path())
        .with_context(|| format!("reading manifest at {}", layout.manifest_path().display()))?;
    let manifest: conduct_domain::Manifest =
        serde_json::from_str(&raw).with_context(|| "manifest.json is not valid JSON for this engine's schema")?;
    Ok(manifest)
}

async fn run_or_resume(spec: &str, fresh: bool, quiet: bool, config_path: Option<&std::path::Path>) -> Result<ExitCode> {
    let layout = conduct_infrastructure::resolve_spec_ref(spec).with_context(|| format!("resolving spec '{spec}'"))?;
    let manifest = load_manifest(&layout)?;

    if fresh {
        let state_dir = layout.state_dir();
        if state_dir.exists() {
            std::fs::remove_dir_all(&state_dir).with_context(|| "clearing existing state for --fresh run")?;
        }
    }

    let file_config = ConfigLoader::load(config_path.map(|p| p.to_path_buf()).as_ref())
        .map_err(|e| anyhow::anyhow!("loading configuration: {e}"))?;
    let (engine_config, roster, runner_config) =
        file_config.into_parts().map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    let schemas = Arc::new(conduct_domain::SchemaRegistry::new());
    let runner: Arc<dyn conduct_application::AgentRunnerPort> = Arc::new(SubprocessAgentRunner::new(
        runner_config.command,
        runner_config.args,
        engine_config.runner_retries,
        schemas,
    ));
    let state_store = Arc::new(JsonFileStateStore::new(layout.state_dir()));
    let context_store: Arc<dyn conduct_application::ContextStorePort> =
        match JsonlContextStore::new(layout.context_path()) {
            Some(store) => Arc::new(store),
            None => Arc::new(conduct_application::ports::context_store::NoContextStore),
        };
    let progress: Arc<dyn conduct_application::EngineProgressPort> =
        if quiet { Arc::new(SimpleProgress) } else { Arc::new(IndicatifProgress::new()) };

    let engine = RunEngineUseCase::new(runner, Arc::clone(&state_store), context_store, progress, engine_config);

    match engine.run(&manifest, &roster, !fresh).await {
        Ok(state) => {
            println!("{}", ConsoleFormatter::format_status(&state, StatusOutputFormat::Text));
            Ok(ExitCode::from(0))
        }
        Err(err) => {
            let resume_cmd = format!("conduct resume --spec {spec}");
            if let Ok(state) = state_store.latest().await {
                eprint!("{}", ConsoleFormatter::format_run_failure(&err, &state, &resume_cmd));
            } else {
                eprintln!("{err}\nresume with: {resume_cmd}");
            }
            Ok(exit_code_for(&err))
        }
    }
}

fn exit_code_for(err: &RunEngineError) -> ExitCode {
    match err {
        RunEngineError::VotingNoQuorum { .. } => ExitCode::from(2),
        _ => ExitCode::from(1),
    }
}

async fn status(spec: &str, output: StatusOutputFormat) -> Result<ExitCode> {
    let layout = conduct_infrastructure::resolve_spec_ref(spec)?;
    let state_store = JsonFileStateStore::new(layout.state_dir());

    match state_store.latest().await {
        Ok(state) => {
            println!("{}", ConsoleFormatter::format_status(&state, output));
            Ok(ExitCode::from(0))
        }
        Err(_) => {
            println!("no run state found for '{spec}' yet");
            Ok(ExitCode::from(0))
        }
    }
}

async fn validate(spec: &str) -> Result<ExitCode> {
    let layout = conduct_infrastructure::resolve_spec_ref(spec)?;
    let manifest = load_manifest(&layout)?;
    let result = conduct_domain::manifest::validate_manifest(&manifest);
    println!("{}", ConsoleFormatter::format_validation(&manifest, &result));
    Ok(if result.is_ok() { ExitCode::from(0) } else { ExitCode::from(1) })
}

async fn new_spec(project: &str, name: &str) -> Result<ExitCode> {
    let created = chrono::Utc::now().to_rfc3339();
    match conduct_infrastructure::create_spec_dir(project, name, &created) {
        Ok(layout) => {
            let manifest = conduct_domain::Manifest::new(name, Vec::new())
                .with_project(project)
                .with_created(created);
            let json = serde_json::to_vec_pretty(&manifest)?;
            std::fs::write(layout.manifest_path(), json)?;
            println!("created spec directory: {}", layout.root().display());
            Ok(ExitCode::from(0))
        }
        Err(err) => {
            bail!("could not create spec '{project}/{name}': {err}");
        }
    }
}

async fn list(project: Option<&str>) -> Result<ExitCode> {
    let dirs = conduct_infrastructure::list_spec_dirs(project)?;
    let entries: Vec<(String, String)> = dirs
        .iter()
        .filter_map(|layout| {
            let root = layout.root();
            let name = root.file_name()?.to_str()?.to_string();
            let project = root.parent()?.file_name()?.to_str()?.to_string();
            Some((project, name))
        })
        .collect();
    println!("{}", ConsoleFormatter::format_spec_list(&entries));
    Ok(ExitCode::from(0))
}
