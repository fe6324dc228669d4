//! Calls into the Lua side of the bridge
//!
//! The Neovim plugin exposes a module (default `codex.mcp_bridge`) with three
//! functions; this type renders the Lua chunks that reach them. Every call
//! carries a limit on how long to wait for Neovim's reply.

use std::time::Duration;

use serde_json::{Map, Value};

use super::client::{RpcResult, Session};

/// Handle on the remote bridge module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LuaBridge {
    module: String,
}

impl Default for LuaBridge {
    fn default() -> Self {
        Self::new("codex.mcp_bridge")
    }
}

impl LuaBridge {
    /// `module` must already be validated as a dotted identifier
    pub fn new(module: impl Into<String>) -> Self {
        Self { module: module.into() }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    fn chunk(&self, function: &str) -> String {
        format!("return require('{}').{}(...)", self.module, function)
    }

    /// `get_tool_list()`: the remote tool descriptors
    pub fn list_tools(&self, session: &dyn Session, limit: Duration) -> RpcResult<Value> {
        session.exec_lua_within(&self.chunk("get_tool_list"), Vec::new(), limit)
    }

    /// `call_tool(name, args, timeout_ms)`: an envelope or a deferred ticket
    pub fn call_tool(
        &self,
        session: &dyn Session,
        name: &str,
        args: &Map<String, Value>,
        timeout_ms: Option<u64>,
        limit: Duration,
    ) -> RpcResult<Value> {
        let params = vec![
            Value::String(name.to_string()),
            Value::Object(args.clone()),
            timeout_ms.map(Value::from).unwrap_or(Value::Null),
        ];
        session.exec_lua_within(&self.chunk("call_tool"), params, limit)
    }

    /// `poll_deferred(key)`: nil while the call is still running
    pub fn poll_deferred(&self, session: &dyn Session, key: &Value, limit: Duration) -> RpcResult<Value> {
        session.exec_lua_within(&self.chunk("poll_deferred"), vec![key.clone()], limit)
    }
}
