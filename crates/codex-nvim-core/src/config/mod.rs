//! Bridge configuration
//!
//! Sources, lowest precedence first:
//! - built-in defaults
//! - `~/.config/codex-nvim/config.yaml`
//! - `CODEX_NVIM_*` environment variables
//! - command line flags (applied by the binary)

mod file;

pub use file::{BridgeConfig, REGISTRY_ENV, LOG_FILE_ENV, LUA_MODULE_ENV, TIMEOUT_ENV};

/// Errors that can occur while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
