//! Tool error types

use thiserror::Error;

use crate::rpc::RpcError;

/// Code carried by a deferred call that outlived its deadline
pub const TIMEOUT_ERROR_CODE: i64 = -32000;

/// Errors that can occur while compiling or calling a tool
#[derive(Error, Debug)]
pub enum ToolError {
    /// The tool's `inputSchema` is not usable; the tool is not registered
    #[error("Invalid schema for tool {tool}: {reason}")]
    SchemaInvalid { tool: String, reason: String },

    /// Arguments did not match the compiled signature; nothing was sent
    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// The remote returned an error envelope
    #[error("{message}")]
    Execution { code: Option<i64>, message: String },

    /// A deferred call did not resolve before its deadline
    #[error("Tool execution timed out: {tool}")]
    Timeout { tool: String, code: i64 },

    #[error("No tool named {0}")]
    UnknownTool(String),

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// The blocking worker running the remote call panicked or was cancelled
    #[error("Tool worker failed: {0}")]
    Worker(String),
}

impl ToolError {
    pub fn timeout(tool: impl Into<String>) -> Self {
        Self::Timeout {
            tool: tool.into(),
            code: TIMEOUT_ERROR_CODE,
        }
    }

    pub fn invalid_arguments(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Remote error code, when there is one
    pub fn code(&self) -> Option<i64> {
        match self {
            ToolError::Execution { code, .. } => *code,
            ToolError::Timeout { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type ToolResult<T> = Result<T, ToolError>;
