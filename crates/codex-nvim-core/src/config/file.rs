//! File-based bridge configuration (YAML)
//!
//! Read from `~/.config/codex-nvim/config.yaml` when present. Every field has
//! a default, so the file is optional and may set only what it needs.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{ConfigError, ConfigResult};

/// Overrides the registry file location
pub const REGISTRY_ENV: &str = "CODEX_NVIM_REGISTRY";
/// Overrides the diagnostics log location
pub const LOG_FILE_ENV: &str = "CODEX_NVIM_LOG_FILE";
/// Overrides the Lua module implementing the remote tools
pub const LUA_MODULE_ENV: &str = "CODEX_NVIM_LUA_MODULE";
/// Overrides the deferred call timeout, in milliseconds
pub const TIMEOUT_ENV: &str = "CODEX_NVIM_TIMEOUT_MS";

/// Bridge settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// JSON registry written by the Neovim plugin (`~/.codex/nvim_instances.json`)
    pub registry_path: PathBuf,
    /// Diagnostics log (`~/.codex/codex-nvim-mcp.log`)
    pub log_path: PathBuf,
    /// Lua module exposing `get_tool_list`, `call_tool` and `poll_deferred`
    pub lua_module: String,
    /// Connection attempts before giving up
    pub connect_attempts: u32,
    /// Settle delay between connection attempts
    pub connect_retry_delay_ms: u64,
    /// Interval between deferred-result polls
    pub poll_interval_ms: u64,
    /// Deadline for deferred calls when the caller gives none
    pub default_timeout_ms: u64,
    /// Longest wait for Neovim to answer a request outside a tool call
    pub request_timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        let codex_dir = codex_dir();
        Self {
            registry_path: codex_dir.join("nvim_instances.json"),
            log_path: codex_dir.join("codex-nvim-mcp.log"),
            lua_module: "codex.mcp_bridge".to_string(),
            connect_attempts: 10,
            connect_retry_delay_ms: 300,
            poll_interval_ms: 50,
            default_timeout_ms: 300_000,
            request_timeout_ms: 30_000,
        }
    }
}

fn codex_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".codex")
}

impl BridgeConfig {
    /// Default location of the user config file
    pub fn user_config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        config_dir.join("codex-nvim").join("config.yaml")
    }

    /// Load the user config file, falling back to defaults if it is missing
    pub fn load_user() -> ConfigResult<Self> {
        Self::load(Self::user_config_path())
    }

    /// Load config from a YAML file; a missing or empty file yields defaults
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))
    }

    /// Apply overrides from the process environment
    pub fn apply_env(self) -> ConfigResult<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (the environment, in production)
    pub fn apply_overrides<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(REGISTRY_ENV).filter(|v| !v.is_empty()) {
            self.registry_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(LOG_FILE_ENV).filter(|v| !v.is_empty()) {
            self.log_path = PathBuf::from(path);
        }
        if let Some(module) = lookup(LUA_MODULE_ENV).filter(|v| !v.is_empty()) {
            self.lua_module = module;
        }
        if let Some(timeout) = lookup(TIMEOUT_ENV).filter(|v| !v.is_empty()) {
            self.default_timeout_ms = timeout.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{} must be a number of milliseconds, got {:?}", TIMEOUT_ENV, timeout))
            })?;
        }
        Ok(self)
    }

    /// Check values that would make the bridge misbehave
    pub fn validate(&self) -> ConfigResult<()> {
        if self.connect_attempts == 0 {
            return Err(ConfigError::Invalid("connect_attempts must be at least 1".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be at least 1".to_string()));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid("request_timeout_ms must be at least 1".to_string()));
        }
        if !is_lua_module_name(&self.lua_module) {
            return Err(ConfigError::Invalid(format!(
                "lua_module {:?} is not a dotted identifier",
                self.lua_module
            )));
        }
        Ok(())
    }

    pub fn connect_retry_delay(&self) -> Duration {
        Duration::from_millis(self.connect_retry_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// The module name is spliced into Lua source, so only `a.b_c.d` shapes pass
fn is_lua_module_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
