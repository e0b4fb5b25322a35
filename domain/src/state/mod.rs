//! Run state: the persisted, resumable record of one engine run's progress.

pub mod entities;

pub use entities::{ComponentState, ComponentStatus, State};
