//! Progress reporting for engine runs.
//!
//! Two implementations: one fancy variant that keeps a per-phase
//! `indicatif` bar alive across a run, and a quiet variant that just
//! prints a line per event. Keyed on [`Phase`]/[`ComponentId`].

use colored::Colorize;
use conduct_application::ports::progress::EngineProgressPort;
use conduct_domain::{ComponentId, Phase};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// Reports progress with a live `indicatif` spinner that tracks the
/// current phase and the most recent component event.
pub struct IndicatifProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        Self { bar: Mutex::new(None) }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg}")
            .unwrap()
    }
}

impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineProgressPort for IndicatifProgress {
    fn on_phase_start(&self, phase: Phase) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(Self::spinner_style());
        pb.set_prefix(phase.display_name().to_string());
        pb.set_message("starting...");
        pb.enable_steady_tick(std::time::Duration::from_millis(120));
        *self.bar.lock().unwrap() = Some(pb);
    }

    fn on_phase_complete(&self, phase: Phase) {
        if let Some(pb) = self.bar.lock().unwrap().take() {
            pb.finish_with_message(format!("{} complete", phase.display_name()).green().to_string());
        }
    }

    fn on_component_start(&self, component: &ComponentId) {
        if let Some(pb) = self.bar.lock().unwrap().as_ref() {
            pb.set_message(format!("building {component}"));
        }
    }

    fn on_component_validated(&self, component: &ComponentId) {
        if let Some(pb) = self.bar.lock().unwrap().as_ref() {
            pb.set_message(format!("{} {component}", "validated".green()));
        }
    }

    fn on_component_failed(&self, component: &ComponentId, reason: &str) {
        if let Some(pb) = self.bar.lock().unwrap().as_ref() {
            pb.set_message(format!("{} {component}: {reason}", "failed".red()));
        }
    }

    fn on_fix_attempt(&self, component: &ComponentId, attempt: u32) {
        if let Some(pb) = self.bar.lock().unwrap().as_ref() {
            pb.set_message(format!("{component}: fix attempt {attempt}"));
        }
    }

    fn on_voting_gate(&self, description: &str, votes_for: usize, total: usize) {
        if let Some(pb) = self.bar.lock().unwrap().as_ref() {
            pb.println(format!("{} {description}: {votes_for}/{total}", "vote".cyan()));
        }
    }
}

/// Quiet progress reporter: one printed line per event, no live bar. Used
/// for `--quiet` runs and non-interactive output (piped logs, CI).
pub struct SimpleProgress;

impl EngineProgressPort for SimpleProgress {
    fn on_phase_start(&self, phase: Phase) {
        println!("{} {}", "==>".cyan(), phase.display_name().bold());
    }

    fn on_phase_complete(&self, phase: Phase) {
        println!("{} {} complete", "v".green(), phase.display_name());
    }

    fn on_component_start(&self, component: &ComponentId) {
        println!("  {} building {component}", "->".cyan());
    }

    fn on_component_validated(&self, component: &ComponentId) {
        println!("  {} {component} validated", "v".green());
    }

    fn on_component_failed(&self, component: &ComponentId, reason: &str) {
        println!("  {} {component} failed: {reason}", "x".red());
    }

    fn on_fix_attempt(&self, component: &ComponentId, attempt: u32) {
        println!("  {} {component}: fix attempt {attempt}", "~".yellow());
    }

    fn on_voting_gate(&self, description: &str, votes_for: usize, total: usize) {
        println!("  {} {description}: {votes_for}/{total}", "vote".cyan());
    }
}
