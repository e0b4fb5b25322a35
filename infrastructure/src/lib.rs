//! Infrastructure layer for conduct.
//!
//! Adapters that implement the ports defined in `conduct-application`:
//! configuration file loading, the subprocess agent runner, and the
//! state/context file stores.

pub mod config;
pub mod context_store;
pub mod paths;
pub mod runner;
pub mod state_store;

pub use config::{ConfigLoader, ConfigValidationError, FileAgentConfig, FileConfig, FileEngineConfig, FileRunnerConfig};
pub use context_store::JsonlContextStore;
pub use paths::{conduct_home, create_spec_dir, list_spec_dirs, resolve_spec_ref, specs_root, PathError, SpecLayout};
pub use runner::SubprocessAgentRunner;
pub use state_store::JsonFileStateStore;
