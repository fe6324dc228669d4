//! Compiled operations: argument binding and signature export

use serde_json::{json, Map, Value};

use super::error::{ToolError, ToolResult};
use super::schema::{ParameterDescriptor, SemanticType};

/// A remote tool with a fixed, ordered parameter list
///
/// Holds no per-call state; one instance serves every invocation of its tool.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledOperation {
    name: String,
    description: String,
    parameters: Vec<ParameterDescriptor>,
}

impl CompiledOperation {
    pub fn new(name: &str, description: &str, parameters: Vec<ParameterDescriptor>) -> Self {
        let description = if description.trim().is_empty() {
            format!("Proxy tool for {}", name)
        } else {
            description.to_string()
        };
        Self {
            name: name.to_string(),
            description,
            parameters,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Parameters in signature order: required first, then by wire name
    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    fn parameter(&self, key: &str) -> Option<&ParameterDescriptor> {
        self.parameters
            .iter()
            .find(|p| p.local_identifier == key)
            .or_else(|| self.parameters.iter().find(|p| p.wire_name == key))
    }

    /// JSON schema advertised to clients, keyed by local identifier
    pub fn input_schema(&self) -> Map<String, Value> {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut prop = Map::new();
            if let Some(ty) = param.semantic_type.json_type() {
                if param.default_value == Some(Value::Null) {
                    prop.insert("type".to_string(), json!([ty, "null"]));
                } else {
                    prop.insert("type".to_string(), json!(ty));
                }
            }
            if let Some(description) = &param.description {
                prop.insert("description".to_string(), json!(description));
            }
            if let Some(default) = &param.default_value {
                prop.insert("default".to_string(), default.clone());
            }
            properties.insert(param.local_identifier.clone(), Value::Object(prop));

            if param.required {
                required.push(json!(param.local_identifier));
            }
        }

        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }
        schema
    }

    /// Validate caller arguments and build the wire payload
    ///
    /// Arguments are keyed by local identifier, or by wire name as an alias.
    /// An absent optional takes its declared default, or is omitted when it
    /// has none. A `null` for an optional is always omitted, so the remote
    /// applies its own default.
    pub fn bind(&self, args: &Map<String, Value>) -> ToolResult<Map<String, Value>> {
        if let Some(unknown) = args.keys().find(|key| self.parameter(key).is_none()) {
            return Err(ToolError::invalid_arguments(
                &self.name,
                format!("unexpected argument '{}'", unknown),
            ));
        }

        let mut payload = Map::new();
        for param in &self.parameters {
            let supplied = args
                .get(&param.local_identifier)
                .or_else(|| args.get(&param.wire_name));

            let value = match supplied {
                None if !param.required => param.default_value.clone(),
                Some(Value::Null) if !param.required => None,
                None => {
                    return Err(ToolError::invalid_arguments(
                        &self.name,
                        format!("missing required argument '{}'", param.local_identifier),
                    ));
                }
                Some(Value::Null) if param.semantic_type == SemanticType::Any => Some(Value::Null),
                Some(value) => {
                    let coerced = param.semantic_type.coerce(value).ok_or_else(|| {
                        ToolError::invalid_arguments(
                            &self.name,
                            format!(
                                "argument '{}' expects {}, got {}",
                                param.local_identifier,
                                param.semantic_type.json_type().unwrap_or("any value"),
                                value
                            ),
                        )
                    })?;
                    Some(coerced)
                }
            };

            if let Some(value) = value {
                payload.insert(param.wire_name.clone(), value);
            }
        }

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::super::schema::{compile, ToolDescriptor};
    use super::*;

    fn operation() -> CompiledOperation {
        compile(&ToolDescriptor::new(
            "search",
            "",
            Some(json!({
                "properties": {
                    "1x": {"type": "integer"},
                    "type": {"type": "string", "description": "kind", "default": "file"},
                    "flag": {"type": "boolean", "default": false},
                    "cwd": {"type": "string", "default": null},
                    "limit": {"type": "integer"}
                },
                "required": ["1x"]
            })),
        ))
        .unwrap()
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_description_fallback() {
        assert_eq!(operation().description(), "Proxy tool for search");
        assert_eq!(CompiledOperation::new("x", "Does x", Vec::new()).description(), "Does x");
    }

    #[test]
    fn test_bind_maps_back_to_wire_names() {
        let payload = operation()
            .bind(&args(json!({"param_1x": 3, "type_": "dir", "limit": "10"})))
            .unwrap();
        assert_eq!(
            Value::Object(payload),
            json!({"1x": 3, "type": "dir", "flag": false, "cwd": null, "limit": 10})
        );
    }

    #[test]
    fn test_bind_fills_declared_defaults_and_omits_absent() {
        let payload = operation().bind(&args(json!({"param_1x": 1}))).unwrap();
        assert_eq!(
            Value::Object(payload),
            json!({"1x": 1, "type": "file", "flag": false, "cwd": null})
        );
    }

    #[test]
    fn test_bind_null_optional_is_omitted() {
        let payload = operation()
            .bind(&args(json!({"param_1x": 1, "limit": null, "flag": null})))
            .unwrap();
        assert!(!payload.contains_key("limit"));
        assert!(!payload.contains_key("flag"));

        // Left out entirely, the declared default still applies
        let payload = operation().bind(&args(json!({"param_1x": 1}))).unwrap();
        assert_eq!(payload["flag"], json!(false));
    }

    #[test]
    fn test_bind_accepts_wire_name_alias() {
        let payload = operation().bind(&args(json!({"1x": 2, "type": "x"}))).unwrap();
        assert_eq!(payload["1x"], json!(2));
        assert_eq!(payload["type"], json!("x"));
    }

    #[test]
    fn test_bind_errors() {
        let op = operation();

        let missing = op.bind(&Map::new()).unwrap_err();
        assert!(missing.to_string().contains("missing required argument 'param_1x'"));

        let unknown = op.bind(&args(json!({"param_1x": 1, "bogus": 1}))).unwrap_err();
        assert!(unknown.to_string().contains("unexpected argument 'bogus'"));

        let wrong = op.bind(&args(json!({"param_1x": "many"}))).unwrap_err();
        assert!(matches!(wrong, ToolError::InvalidArguments { .. }));

        let null_required = op.bind(&args(json!({"param_1x": null}))).unwrap_err();
        assert!(matches!(null_required, ToolError::InvalidArguments { .. }));
    }

    #[test]
    fn test_payload_keys_are_wire_names() {
        let op = operation();
        let mut all = Map::new();
        for param in op.parameters() {
            let value = match param.semantic_type {
                SemanticType::Integer => json!(1),
                SemanticType::Boolean => json!(true),
                _ => json!("v"),
            };
            all.insert(param.local_identifier.clone(), value);
        }

        let payload = op.bind(&all).unwrap();
        let mut keys: Vec<_> = payload.keys().cloned().collect();
        let mut wire: Vec<_> = op.parameters().iter().map(|p| p.wire_name.clone()).collect();
        keys.sort();
        wire.sort();
        assert_eq!(keys, wire);
    }

    #[test]
    fn test_input_schema() {
        let schema = Value::Object(operation().input_schema());
        assert_eq!(schema["type"], json!("object"));
        assert_eq!(schema["required"], json!(["param_1x"]));
        assert_eq!(schema["properties"]["param_1x"], json!({"type": "integer"}));
        assert_eq!(
            schema["properties"]["type_"],
            json!({"type": "string", "description": "kind", "default": "file"})
        );
        assert_eq!(
            schema["properties"]["cwd"],
            json!({"type": ["string", "null"], "default": null})
        );

        let empty = Value::Object(CompiledOperation::new("x", "", Vec::new()).input_schema());
        assert_eq!(empty, json!({"type": "object", "properties": {}}));
    }
}
