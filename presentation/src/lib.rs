//! Presentation layer for conduct.
//!
//! This crate contains CLI definitions, output formatters, and progress
//! reporters.

pub mod cli;
pub mod output;
pub mod progress;

pub use cli::{Cli, Command, StatusOutputFormat};
pub use output::ConsoleFormatter;
pub use progress::reporter::{IndicatifProgress, SimpleProgress};
