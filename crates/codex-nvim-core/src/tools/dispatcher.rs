//! Dispatching tool calls to Neovim
//!
//! A call is one remote evaluation. The remote either answers with an
//! envelope (`{result}` / `{error}`) or hands back a deferred ticket, which we
//! poll until it resolves or the deadline passes.
//!
//! Every round trip is bounded too: a Neovim that stops answering ends the
//! call with the same timeout error as a ticket that never resolves.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::time::{sleep, Instant};

use super::error::{ToolError, ToolResult};
use super::is_truthy;
use super::schema::ToolDescriptor;
use crate::config::BridgeConfig;
use crate::logging::SharedLogger;
use crate::{log_debug, log_warn};
use crate::rpc::{LuaBridge, RpcError, RpcResult, Session};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(300_000);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Handle for a call still running on the remote side
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredTicket {
    pub key: Value,
    pub created_at: Instant,
}

impl DeferredTicket {
    /// `{_deferred: true, key: ...}` with both fields truthy
    pub fn from_response(response: &Value) -> Option<Self> {
        let obj = response.as_object()?;
        let deferred = obj.get("_deferred").is_some_and(is_truthy);
        let key = obj.get("key").filter(|k| is_truthy(k))?;
        deferred.then(|| Self {
            key: key.clone(),
            created_at: Instant::now(),
        })
    }
}

/// Unwrap a `{result}` / `{error}` envelope
///
/// An `error` key wins over `result`, whatever its value. Anything that is
/// not an envelope is passed through unchanged.
pub fn normalize_envelope(response: Value) -> ToolResult<Value> {
    let Value::Object(mut obj) = response else {
        return Ok(response);
    };

    if let Some(error) = obj.get("error") {
        return Err(execution_error(error));
    }
    if let Some(result) = obj.remove("result") {
        return Ok(result);
    }
    Ok(Value::Object(obj))
}

fn execution_error(error: &Value) -> ToolError {
    let field = |name: &str| error.as_object().and_then(|e| e.get(name));

    let mut message = match field("message") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(other) if is_truthy(other) => other.to_string(),
        _ => "Tool error".to_string(),
    };
    if let Some(data) = field("data").filter(|d| is_truthy(d)) {
        match data {
            Value::String(s) => message.push_str(&format!(": {}", s)),
            other => message.push_str(&format!(": {}", other)),
        }
    }

    ToolError::Execution {
        code: field("code").and_then(Value::as_i64),
        message,
    }
}

/// Sends calls over a shared session, one blocking round trip at a time
pub struct CallDispatcher {
    session: Arc<dyn Session>,
    bridge: LuaBridge,
    poll_interval: Duration,
    default_timeout: Duration,
    request_timeout: Duration,
    logger: SharedLogger,
}

impl CallDispatcher {
    pub fn new(session: Arc<dyn Session>, bridge: LuaBridge, logger: SharedLogger) -> Self {
        Self {
            session,
            bridge,
            poll_interval: DEFAULT_POLL_INTERVAL,
            default_timeout: DEFAULT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            logger,
        }
    }

    pub fn from_config(session: Arc<dyn Session>, config: &BridgeConfig, logger: SharedLogger) -> Self {
        Self::new(session, LuaBridge::new(&config.lua_module), logger)
            .with_poll_interval(config.poll_interval())
            .with_default_timeout(config.default_timeout())
            .with_request_timeout(config.request_timeout())
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Bound on round trips that have no call deadline, such as the listing
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn bridge(&self) -> &LuaBridge {
        &self.bridge
    }

    /// Run one session round trip on the blocking pool
    async fn remote<F>(&self, call: F) -> ToolResult<Value>
    where
        F: FnOnce(&dyn Session, &LuaBridge) -> RpcResult<Value> + Send + 'static,
    {
        let session = self.session.clone();
        let bridge = self.bridge.clone();
        let outcome = tokio::task::spawn_blocking(move || call(session.as_ref(), &bridge))
            .await
            .map_err(|e| ToolError::Worker(e.to_string()))?;
        Ok(outcome?)
    }

    /// Fetch the remote tool listing
    ///
    /// A listing that is not an array yields no tools; malformed entries are
    /// dropped with a warning.
    pub async fn list_tools(&self) -> ToolResult<Vec<ToolDescriptor>> {
        let limit = self.request_timeout;
        let listing = self.remote(move |session, bridge| bridge.list_tools(session, limit)).await?;
        let Value::Array(entries) = listing else {
            self.logger.warn("Tool listing is not a list; no tools available");
            return Ok(Vec::new());
        };

        let mut tools = Vec::with_capacity(entries.len());
        for entry in &entries {
            match ToolDescriptor::from_listing(entry) {
                Some(tool) => tools.push(tool),
                None => log_warn!(self.logger, "Skipping malformed tool entry: {}", entry),
            }
        }
        Ok(tools)
    }

    /// Call a tool and wait for its result
    ///
    /// `timeout` bounds the whole call, including how long a deferred call is
    /// polled; it is also passed to the remote side. `None` or zero falls back
    /// to the configured default.
    pub async fn invoke(
        &self,
        tool_name: &str,
        args: Map<String, Value>,
        timeout: Option<Duration>,
    ) -> ToolResult<Value> {
        let budget = timeout.filter(|t| !t.is_zero()).unwrap_or(self.default_timeout);
        let name = tool_name.to_string();
        let timeout_ms = timeout.map(|t| t.as_millis() as u64);
        let response = self
            .remote(move |session, bridge| bridge.call_tool(session, &name, &args, timeout_ms, budget))
            .await
            .map_err(|e| self.timed_out(tool_name, e))?;

        let Some(ticket) = DeferredTicket::from_response(&response) else {
            return normalize_envelope(response);
        };

        let deadline = ticket.created_at + budget;
        log_debug!(self.logger, "{} deferred as {}", tool_name, ticket.key);

        loop {
            if Instant::now() >= deadline {
                log_warn!(self.logger, "Tool {} timed out", tool_name);
                return Err(ToolError::timeout(tool_name));
            }

            let key = ticket.key.clone();
            let limit = deadline.saturating_duration_since(Instant::now());
            let polled = self
                .remote(move |session, bridge| bridge.poll_deferred(session, &key, limit))
                .await
                .map_err(|e| self.timed_out(tool_name, e))?;
            if !polled.is_null() {
                return normalize_envelope(polled);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            sleep(self.poll_interval.min(remaining)).await;
        }
    }

    /// A round trip that outlived its limit is the call's timeout
    fn timed_out(&self, tool_name: &str, error: ToolError) -> ToolError {
        match error {
            ToolError::Rpc(RpcError::Timeout(limit)) => {
                log_warn!(
                    self.logger,
                    "Tool {} timed out after {} ms without a reply from Neovim",
                    tool_name,
                    limit.as_millis()
                );
                ToolError::timeout(tool_name)
            }
            other => other,
        }
    }
}
