//! CLI argument/subcommand definitions.

pub mod commands;

pub use commands::{Cli, Command, StatusOutputFormat};
