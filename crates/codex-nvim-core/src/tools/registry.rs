//! Tool registry: the compiled operations served to MCP clients
//!
//! `refresh()` is the registration pass. It lists the remote tools once,
//! compiles each one and keeps the operations that compiled.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};

use super::dispatcher::CallDispatcher;
use super::error::{ToolError, ToolResult};
use super::operation::CompiledOperation;
use super::schema::compile;
use crate::logging::SharedLogger;

/// Outcome of a registration pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationReport {
    /// Names of the operations now registered, in listing order
    pub registered: Vec<String>,
    /// Tools that failed to compile, with the reason
    pub skipped: Vec<(String, String)>,
}

/// Registry of compiled operations
pub struct ToolRegistry {
    dispatcher: Arc<CallDispatcher>,
    operations: RwLock<Vec<Arc<CompiledOperation>>>,
    logger: SharedLogger,
}

impl ToolRegistry {
    pub fn new(dispatcher: Arc<CallDispatcher>, logger: SharedLogger) -> Self {
        Self {
            dispatcher,
            operations: RwLock::new(Vec::new()),
            logger,
        }
    }

    /// List the remote tools and register every one that compiles
    ///
    /// A tool with an unusable schema is logged and skipped; the others still
    /// register. Fails only when the listing itself cannot be fetched.
    pub async fn refresh(&self) -> ToolResult<RegistrationReport> {
        let tools = self.dispatcher.list_tools().await.map_err(|e| {
            self.logger.error(&format!("[ToolRegistry] Failed to fetch tools: {}", e));
            e
        })?;

        self.logger.info(&format!(
            "[ToolRegistry] Discovered {} tools from Neovim",
            tools.len()
        ));

        let mut report = RegistrationReport::default();
        for tool in &tools {
            match compile(tool) {
                Ok(operation) => {
                    report.registered.push(operation.name().to_string());
                    self.register(operation);
                }
                Err(e) => {
                    self.logger.warn(&format!("[ToolRegistry] Skipping {}: {}", tool.name, e));
                    report.skipped.push((tool.name.clone(), e.to_string()));
                }
            }
        }

        self.logger.info(&format!(
            "[ToolRegistry] Registered {} tools ({} skipped)",
            report.registered.len(),
            report.skipped.len()
        ));
        Ok(report)
    }

    /// Add an operation, replacing any with the same name
    pub fn register(&self, operation: CompiledOperation) {
        let mut operations = self.operations.write();
        if let Some(existing) = operations.iter_mut().find(|op| op.name() == operation.name()) {
            self.logger.warn(&format!(
                "[ToolRegistry] Duplicate tool {}; keeping the later definition",
                operation.name()
            ));
            *existing = Arc::new(operation);
        } else {
            operations.push(Arc::new(operation));
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<CompiledOperation>> {
        self.operations.read().iter().find(|op| op.name() == name).cloned()
    }

    /// Registered operations in registration order
    pub fn operations(&self) -> Vec<Arc<CompiledOperation>> {
        self.operations.read().clone()
    }

    pub fn tool_count(&self) -> usize {
        self.operations.read().len()
    }

    /// Bind arguments against the operation's signature and dispatch
    pub async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> ToolResult<Value> {
        let operation = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let payload = operation.bind(&arguments)?;

        self.logger.info(&format!("[ToolRegistry] Calling tool: {}", name));
        self.dispatcher.invoke(name, payload, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::rpc::{LuaBridge, RpcResult, Session};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::VecDeque;

    struct ScriptedSession {
        responses: Mutex<VecDeque<Value>>,
        calls: Mutex<Vec<Vec<Value>>>,
    }

    impl ScriptedSession {
        fn new(responses: Vec<Value>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    impl Session for ScriptedSession {
        fn exec_lua(&self, _code: &str, args: Vec<Value>) -> RpcResult<Value> {
            self.calls.lock().push(args);
            Ok(self.responses.lock().pop_front().unwrap_or(Value::Null))
        }
    }

    fn registry(session: Arc<ScriptedSession>) -> ToolRegistry {
        let logger: SharedLogger = Arc::new(NoOpLogger::new());
        let dispatcher = CallDispatcher::new(session, LuaBridge::default(), logger.clone());
        ToolRegistry::new(Arc::new(dispatcher), logger)
    }

    fn listing() -> Value {
        json!([
            {
                "name": "open_file",
                "description": "Open a file",
                "inputSchema": {
                    "properties": {"path": {"type": "string"}, "line": {"type": "integer"}},
                    "required": ["path"]
                }
            },
            {"name": "broken", "inputSchema": "nope"},
            {"name": "noop", "inputSchema": []}
        ])
    }

    #[tokio::test]
    async fn test_refresh_skips_invalid_schemas() {
        let registry = registry(ScriptedSession::new(vec![listing()]));
        let report = registry.refresh().await.unwrap();

        assert_eq!(report.registered, vec!["open_file", "noop"]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].0, "broken");
        assert_eq!(registry.tool_count(), 2);
        assert!(registry.get("broken").is_none());
        assert_eq!(registry.get("noop").unwrap().description(), "Proxy tool for noop");
    }

    #[tokio::test]
    async fn test_refresh_with_no_tools() {
        let registry = registry(ScriptedSession::new(vec![Value::Null]));
        let report = registry.refresh().await.unwrap();
        assert!(report.registered.is_empty());
        assert_eq!(registry.tool_count(), 0);
    }

    #[tokio::test]
    async fn test_call_tool_sends_wire_payload() {
        let session = ScriptedSession::new(vec![listing(), json!({"result": "opened"})]);
        let registry = registry(session.clone());
        registry.refresh().await.unwrap();

        let mut args = Map::new();
        args.insert("path".to_string(), json!("/tmp/a.txt"));
        args.insert("line".to_string(), json!("12"));
        let value = registry.call_tool("open_file", args).await.unwrap();

        assert_eq!(value, json!("opened"));
        let calls = session.calls.lock();
        assert_eq!(
            calls[1],
            vec![json!("open_file"), json!({"path": "/tmp/a.txt", "line": 12}), Value::Null]
        );
    }

    #[tokio::test]
    async fn test_call_tool_rejects_bad_arguments_locally() {
        let session = ScriptedSession::new(vec![listing()]);
        let registry = registry(session.clone());
        registry.refresh().await.unwrap();

        let err = registry.call_tool("open_file", Map::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
        // Only the listing reached Neovim
        assert_eq!(session.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = registry(ScriptedSession::new(vec![]));
        let err = registry.call_tool("missing", Map::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(ref name) if name == "missing"));
    }

    #[test]
    fn test_register_replaces_same_name() {
        let registry = registry(ScriptedSession::new(vec![]));
        registry.register(CompiledOperation::new("a", "first", Vec::new()));
        registry.register(CompiledOperation::new("b", "", Vec::new()));
        registry.register(CompiledOperation::new("a", "second", Vec::new()));

        let names: Vec<_> = registry.operations().iter().map(|op| op.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().description(), "second");
    }
}
