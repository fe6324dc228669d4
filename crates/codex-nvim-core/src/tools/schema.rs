//! Compiling remote tool schemas into typed parameter lists

use serde_json::{Map, Value};

use super::error::{ToolError, ToolResult};
use super::identifier::IdentifierAllocator;
use super::is_truthy;
use super::operation::CompiledOperation;

/// Parameter type derived from the top level of a property schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticType {
    String,
    Integer,
    Float,
    Boolean,
    List,
    Map,
    Any,
}

impl SemanticType {
    fn from_name(name: &str) -> Self {
        match name {
            "string" => SemanticType::String,
            "integer" => SemanticType::Integer,
            "number" => SemanticType::Float,
            "boolean" => SemanticType::Boolean,
            "array" => SemanticType::List,
            "object" => SemanticType::Map,
            _ => SemanticType::Any,
        }
    }

    /// Read the `type` keyword of a property schema
    ///
    /// A list of types collapses to its single non-`null` member; any other
    /// entry, named or not, makes the list a union.
    pub fn from_schema(schema: &Map<String, Value>) -> Self {
        match schema.get("type") {
            Some(Value::String(name)) => Self::from_name(name),
            Some(Value::Array(names)) => {
                let concrete: Vec<&Value> = names.iter().filter(|name| name.as_str() != Some("null")).collect();
                match concrete.as_slice() {
                    [Value::String(single)] => Self::from_name(single),
                    _ => SemanticType::Any,
                }
            }
            _ => SemanticType::Any,
        }
    }

    /// JSON Schema type name, `None` for `Any`
    pub fn json_type(&self) -> Option<&'static str> {
        match self {
            SemanticType::String => Some("string"),
            SemanticType::Integer => Some("integer"),
            SemanticType::Float => Some("number"),
            SemanticType::Boolean => Some("boolean"),
            SemanticType::List => Some("array"),
            SemanticType::Map => Some("object"),
            SemanticType::Any => None,
        }
    }

    /// Coerce a caller value to this type, `None` if it does not fit
    pub fn coerce(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (SemanticType::Any, v) => Some(v.clone()),
            (SemanticType::String, Value::String(_)) => Some(value.clone()),
            (SemanticType::List, Value::Array(_)) => Some(value.clone()),
            (SemanticType::Map, Value::Object(_)) => Some(value.clone()),

            (SemanticType::Integer, Value::Number(n)) => {
                if n.is_i64() || n.is_u64() {
                    Some(value.clone())
                } else {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                        .map(|f| Value::from(f as i64))
                }
            }
            (SemanticType::Integer, Value::String(s)) => {
                s.trim().parse::<i64>().ok().map(Value::from)
            }

            (SemanticType::Float, Value::Number(n)) => n.as_f64().map(Value::from),
            (SemanticType::Float, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::from),

            (SemanticType::Boolean, Value::Bool(_)) => Some(value.clone()),
            (SemanticType::Boolean, Value::Number(n)) => match n.as_f64() {
                Some(f) if f == 0.0 => Some(Value::Bool(false)),
                Some(f) if f == 1.0 => Some(Value::Bool(true)),
                _ => None,
            },
            (SemanticType::Boolean, Value::String(s)) => {
                match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" | "yes" | "on" => Some(Value::Bool(true)),
                    "false" | "0" | "no" | "off" => Some(Value::Bool(false)),
                    _ => None,
                }
            }

            _ => None,
        }
    }
}

/// One parameter of a compiled operation
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    /// Field name as the remote tool expects it
    pub wire_name: String,
    /// Name callers use for this parameter
    pub local_identifier: String,
    pub required: bool,
    pub semantic_type: SemanticType,
    /// Declared schema default; `Some(Value::Null)` is an explicit null
    pub default_value: Option<Value>,
    pub description: Option<String>,
}

/// A tool as the remote listing describes it
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// `None` when the listing has no `inputSchema`
    pub input_schema: Option<Value>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Option<Value>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Read one entry of `get_tool_list()`; entries without a string name are dropped
    pub fn from_listing(entry: &Value) -> Option<Self> {
        let obj = entry.as_object()?;
        let name = obj.get("name")?.as_str()?;
        if name.is_empty() {
            return None;
        }
        let description = obj
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default();
        Some(Self::new(name, description, obj.get("inputSchema").cloned()))
    }
}

/// Turn a tool descriptor into an operation with an ordered, typed signature
///
/// Fails only when `inputSchema` is present, truthy, and not an object. An
/// empty Lua table reaches us as `[]`, so falsy schemas count as `{}`.
pub fn compile(tool: &ToolDescriptor) -> ToolResult<CompiledOperation> {
    let empty = Map::new();
    let schema = match &tool.input_schema {
        Some(Value::Object(obj)) => obj,
        Some(other) if is_truthy(other) => {
            return Err(ToolError::SchemaInvalid {
                tool: tool.name.clone(),
                reason: format!("inputSchema must be an object, got {}", other),
            });
        }
        _ => &empty,
    };

    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut fields: Vec<(&String, &Value, bool)> = properties
        .iter()
        .map(|(name, prop)| (name, prop, required.contains(&name.as_str())))
        .collect();
    fields.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(b.0)));

    let mut allocator = IdentifierAllocator::new();
    let parameters = fields
        .into_iter()
        .map(|(wire_name, prop, required)| {
            let prop = prop.as_object().unwrap_or(&empty);
            ParameterDescriptor {
                wire_name: wire_name.clone(),
                local_identifier: allocator.allocate(wire_name),
                required,
                semantic_type: SemanticType::from_schema(prop),
                default_value: prop.get("default").cloned(),
                description: prop
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }
        })
        .collect();

    Ok(CompiledOperation::new(&tool.name, &tool.description, parameters))
}
