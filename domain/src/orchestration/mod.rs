//! Engine-wide orchestration phases, execution modes, and fix strategy.

pub mod mode;
pub mod phase;
pub mod strategy;

pub use mode::{ExecutionMode, ModeProfile, ParallelismPolicy, SkeletonReviewPolicy};
pub use phase::{Phase, PhaseStatus};
pub use strategy::{FixStrategy, ProductionGateChoice, SkeletonGateChoice};
