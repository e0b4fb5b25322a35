//! Configuration file loading for conduct.
//!
//! This module handles file I/O and merging of configuration from multiple
//! sources. The priority order (highest to lowest):
//!
//! 1. `--config <path>` specified file
//! 2. Project root: `./conduct.toml` or `./.conduct.toml`
//! 3. XDG config: `$XDG_CONFIG_HOME/conduct/config.toml`
//! 4. Fallback: `~/.config/conduct/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileAgentConfig, FileConfig, FileEngineConfig, FileRunnerConfig,
};
pub use loader::ConfigLoader;
