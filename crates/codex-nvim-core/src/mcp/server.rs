//! MCP side of the bridge
//!
//! `BridgeServer` answers `tools/list` from the registry's compiled
//! operations and routes `tools/call` through the registry to Neovim.
//! Tool failures are reported as error results; protocol errors are kept
//! for requests naming a tool that does not exist.

use std::sync::Arc;

use rmcp::{
    handler::server::ServerHandler,
    model::*,
    service::{RequestContext, RoleServer},
    ErrorData as McpError,
};
use serde_json::Value;

use crate::log_warn;
use crate::logging::SharedLogger;
use crate::tools::{ToolError, ToolRegistry};

pub const SERVER_NAME: &str = "codex-nvim";

/// BridgeServer is the MCP ServerHandler that exposes Neovim's tools.
///
/// It owns no tools itself: listing reads the registry's compiled
/// operations and calls are bound and dispatched through the registry.
#[derive(Clone)]
pub struct BridgeServer {
    registry: Arc<ToolRegistry>,
    logger: SharedLogger,
}

impl BridgeServer {
    pub fn new(registry: Arc<ToolRegistry>, logger: SharedLogger) -> Self {
        Self { registry, logger }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Tools as advertised over `tools/list`
    pub fn tools(&self) -> Vec<Tool> {
        self.registry
            .operations()
            .iter()
            .map(|op| {
                Tool::new(
                    op.name().to_string(),
                    op.description().to_string(),
                    Arc::new(op.input_schema()),
                )
            })
            .collect()
    }

    /// Run one `tools/call`
    ///
    /// Failures of the call itself come back as an `isError` result so the
    /// client sees the message; only an unknown tool name is a protocol error.
    pub async fn execute_tool_call(&self, request: CallToolRequestParams) -> Result<CallToolResult, McpError> {
        let tool_name = request.name.to_string();
        let arguments = request.arguments.unwrap_or_default();

        match self.registry.call_tool(&tool_name, arguments).await {
            Ok(value) => Ok(CallToolResult::success(result_content(value))),
            Err(ToolError::UnknownTool(name)) => Err(McpError::invalid_params(
                format!("Unknown tool: {}", name),
                None,
            )),
            Err(e) => {
                log_warn!(self.logger, "Tool {} failed: {}", tool_name, e);
                Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
            }
        }
    }
}

/// Strings go out verbatim, `null` as no content, anything else as JSON
fn result_content(value: Value) -> Vec<Content> {
    match value {
        Value::Null => Vec::new(),
        Value::String(text) => vec![Content::text(text)],
        other => vec![Content::text(
            serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string()),
        )],
    }
}

#[allow(clippy::manual_async_fn)]
impl ServerHandler for BridgeServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                title: Some("Codex Neovim Bridge".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                website_url: None,
                icons: None,
            },
            instructions: Some("Tools provided by the connected Neovim instance".to_string()),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        async {
            Ok(ListToolsResult {
                tools: self.tools(),
                next_cursor: None,
                meta: None,
            })
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move { self.execute_tool_call(request).await }
    }
}
