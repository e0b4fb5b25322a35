//! Console rendering of engine state, validation results, and failures.

use crate::cli::StatusOutputFormat;
use colored::Colorize;
use conduct_application::error::RunEngineError;
use conduct_domain::{ComponentStatus, EngineError, Manifest, State};

/// Formats engine state and results for console display.
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Render a run's current [`State`] for `conduct status`.
    pub fn format_status(state: &State, format: StatusOutputFormat) -> String {
        match format {
            StatusOutputFormat::Json => Self::format_status_json(state),
            StatusOutputFormat::Text => Self::format_status_text(state),
        }
    }

    fn format_status_json(state: &State) -> String {
        serde_json::to_string_pretty(state).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_status_text(state: &State) -> String {
        let mut output = String::new();

        output.push_str(&Self::header(&format!("Run: {}", state.manifest_name)));
        output.push('\n');
        output.push_str(&format!("{} {}\n", "Run id:".cyan().bold(), state.run_id.as_str()));
        output.push_str(&format!(
            "{} {} ({})\n\n",
            "Current phase:".cyan().bold(),
            state.current_phase.display_name(),
            state.phase_status.as_str()
        ));

        output.push_str(&Self::section_header("Components"));
        let mut ids: Vec<_> = state.components.keys().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        for id in ids {
            let component_state = &state.components[id];
            let status_label = Self::status_label(component_state.status);
            output.push_str(&format!("  {status_label} {id}"));
            if component_state.fix_attempts > 0 {
                output.push_str(&format!(" ({} fix attempts)", component_state.fix_attempts));
            }
            if let Some(blocker) = component_state.blockers.last() {
                output.push_str(&format!(" [blocked: {blocker}]"));
            }
            output.push('\n');
        }

        output.push_str(&format!(
            "\n{} {}/{}\n",
            "Validated:".cyan().bold(),
            state.components.values().filter(|c| c.status == ComponentStatus::Validated).count(),
            state.components.len()
        ));

        if !state.voting_results.is_empty() {
            output.push_str(&Self::section_header("Voting gates"));
            for round in &state.voting_results {
                output.push_str(&format!("  {} -> {}", round.gate_name, round.outcome));
                if let Some(chosen) = &round.chosen {
                    output.push_str(&format!(" ({chosen})"));
                }
                output.push('\n');
            }
        }

        if !state.discoveries.is_empty() {
            output.push_str(&Self::section_header("Discoveries"));
            for discovery in &state.discoveries {
                output.push_str(&format!("  [{}] {}: {}\n", discovery.phase, discovery.source_agent, discovery.text));
            }
        }

        output.push_str(&Self::footer());
        output
    }

    /// Render a manifest validation outcome for `conduct validate`.
    pub fn format_validation(manifest: &Manifest, result: &Result<(), EngineError>) -> String {
        match result {
            Ok(()) => format!(
                "{} manifest '{}' is valid ({} components)\n",
                "v".green().bold(),
                manifest.name,
                manifest.components.len()
            ),
            Err(err) => format!("{} manifest '{}' is invalid: {err}\n", "x".red().bold(), manifest.name),
        }
    }

    /// Render a run failure for `conduct run`/`conduct resume`, per the
    /// "user-visible failure" shape: phase, component, error kind, and the
    /// command to resume.
    pub fn format_run_failure(err: &RunEngineError, state: &State, resume_cmd: &str) -> String {
        let mut output = String::new();
        output.push_str(&format!("{} run failed in phase '{}'\n", "x".red().bold(), state.current_phase.display_name()));
        output.push_str(&format!("{} {err}\n", "Error:".red().bold()));

        if let RunEngineError::ValidationFailed { component, attempts } = err {
            output.push_str(&format!("  component: {component} ({attempts} fix attempts exhausted)\n"));
        }

        output.push_str(&format!("\n{} {resume_cmd}\n", "Resume with:".cyan().bold()));
        output
    }

    /// Render the list of known specs for `conduct list`.
    pub fn format_spec_list(entries: &[(String, String)]) -> String {
        if entries.is_empty() {
            return "no specs found\n".to_string();
        }
        let mut output = String::new();
        for (project, name) in entries {
            output.push_str(&format!("  {}/{}\n", project.cyan(), name));
        }
        output
    }

    fn status_label(status: ComponentStatus) -> colored::ColoredString {
        match status {
            ComponentStatus::Pending => "pending".dimmed(),
            ComponentStatus::InProgress => "in_progress".yellow(),
            ComponentStatus::Validated => "validated".green(),
            ComponentStatus::Failed => "failed".red(),
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}
