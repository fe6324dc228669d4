//! Conversion between msgpack values and JSON values
//!
//! The rest of the bridge speaks `serde_json::Value`; only the session sees
//! msgpack. Conversions are total: values JSON cannot represent are degraded
//! (binary becomes a lossy UTF-8 string, extension types become null, non-string
//! map keys are stringified).

use rmpv::Value as MsgValue;
use serde_json::{Map, Number, Value};

/// JSON to msgpack
pub fn to_msgpack(value: &Value) -> MsgValue {
    match value {
        Value::Null => MsgValue::Nil,
        Value::Bool(b) => MsgValue::Boolean(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                MsgValue::from(i)
            } else if let Some(u) = n.as_u64() {
                MsgValue::from(u)
            } else {
                MsgValue::from(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => MsgValue::from(s.as_str()),
        Value::Array(items) => MsgValue::Array(items.iter().map(to_msgpack).collect()),
        Value::Object(map) => MsgValue::Map(
            map.iter()
                .map(|(k, v)| (MsgValue::from(k.as_str()), to_msgpack(v)))
                .collect(),
        ),
    }
}

/// msgpack to JSON
pub fn from_msgpack(value: MsgValue) -> Value {
    match value {
        MsgValue::Nil => Value::Null,
        MsgValue::Boolean(b) => Value::Bool(b),
        MsgValue::Integer(i) => {
            if let Some(v) = i.as_i64() {
                Value::from(v)
            } else if let Some(v) = i.as_u64() {
                Value::from(v)
            } else {
                Value::Null
            }
        }
        MsgValue::F32(f) => float(f64::from(f)),
        MsgValue::F64(f) => float(f),
        MsgValue::String(s) => Value::String(String::from_utf8_lossy(s.as_bytes()).into_owned()),
        MsgValue::Binary(bytes) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
        MsgValue::Array(items) => Value::Array(items.into_iter().map(from_msgpack).collect()),
        MsgValue::Map(pairs) => {
            let mut object = Map::with_capacity(pairs.len());
            for (k, v) in pairs {
                let key = match from_msgpack(k) {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                object.insert(key, from_msgpack(v));
            }
            Value::Object(object)
        }
        MsgValue::Ext(_, _) => Value::Null,
    }
}

/// NaN and infinities have no JSON form
fn float(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}
