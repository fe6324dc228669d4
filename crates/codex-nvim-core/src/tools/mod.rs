//! Tool module: compiling and calling the tools Neovim advertises
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  ToolRegistry (Rust)                        │
//! │                                             │
//! │  - Lists tools via get_tool_list()          │
//! │  - Compiles each inputSchema to a typed     │
//! │    signature (CompiledOperation)            │
//! │  - Binds MCP arguments to wire payloads     │
//! └─────────────────────────────────────────────┘
//!           │
//!           │ CallDispatcher: call_tool / poll_deferred
//!           ▼
//! ┌─────────────────────────────────────────────┐
//! │  Neovim (Lua bridge module)                 │
//! │                                             │
//! │  - Answers {result} / {error} envelopes     │
//! │  - Or a {_deferred, key} ticket to poll     │
//! └─────────────────────────────────────────────┘
//! ```

mod dispatcher;
mod error;
pub mod identifier;
mod operation;
mod registry;
mod schema;

use serde_json::Value;

pub use dispatcher::{
    normalize_envelope, CallDispatcher, DeferredTicket, DEFAULT_POLL_INTERVAL, DEFAULT_REQUEST_TIMEOUT, DEFAULT_TIMEOUT,
};
pub use error::{ToolError, ToolResult, TIMEOUT_ERROR_CODE};
pub use identifier::{sanitize_identifier, IdentifierAllocator};
pub use operation::CompiledOperation;
pub use registry::{RegistrationReport, ToolRegistry};
pub use schema::{compile, ParameterDescriptor, SemanticType, ToolDescriptor};

/// Truthiness applied to envelope and ticket fields
///
/// `null`, `false`, zero, and empty strings, lists and maps are falsy.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!(""), json!([]), json!({})] {
            assert!(!is_truthy(&falsy), "{} should be falsy", falsy);
        }
        for truthy in [json!(true), json!(1), json!(-2.5), json!("x"), json!([0]), json!({"a": null})] {
            assert!(is_truthy(&truthy), "{} should be truthy", truthy);
        }
    }
}
