//! Codex Neovim Core
//!
//! Bridges the tools a running Neovim instance exposes (through its Lua
//! bridge module) to MCP clients.
//!
//! ## Flow
//!
//! - `rpc` finds the freshest registered Neovim instance and opens a
//!   msgpack-rpc session to it
//! - `tools` compiles each advertised tool schema into a typed operation and
//!   dispatches calls, polling deferred results
//! - `mcp` serves the compiled operations over MCP
//!
//! ```rust,ignore
//! use codex_nvim_core::{BridgeConfig, ConnectionManager, CallDispatcher, ToolRegistry};
//!
//! let session = ConnectionManager::from_config(&config, logger.clone()).connect()?;
//! let dispatcher = CallDispatcher::from_config(Arc::new(session), &config, logger.clone());
//!
//! let registry = ToolRegistry::new(Arc::new(dispatcher), logger);
//! registry.refresh().await?;
//!
//! let value = registry.call_tool("open_file", args).await?;
//! ```

pub mod config;
pub mod logging;
pub mod mcp;
pub mod rpc;
pub mod tools;

// Re-export commonly used types
pub use config::{BridgeConfig, ConfigError, ConfigResult};

pub use logging::{ChainLogger, ConsoleLogger, FileLogger, LogLevel, Logger, NoOpLogger, SharedLogger};

pub use rpc::{
    parse_address, select_instance, ConnectionManager, EndpointDescriptor, EndpointRegistry, LuaBridge,
    NvimSession, RpcError, RpcResult, Session, Transport,
};

pub use tools::{
    compile, CallDispatcher, CompiledOperation, ParameterDescriptor, RegistrationReport, SemanticType,
    ToolDescriptor, ToolError, ToolRegistry, ToolResult,
};

pub use mcp::BridgeServer;
