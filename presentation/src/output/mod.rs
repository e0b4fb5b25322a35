//! Console rendering of run state, vote outcomes, and failures.

pub mod console;

pub use console::ConsoleFormatter;
