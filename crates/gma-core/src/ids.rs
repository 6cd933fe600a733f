//! Identifier normalization.
//!
//! GMA mixes numeric and string ids freely (`nodeId: 12` in one response,
//! `{"12": "name"}` object keys in another). Ids are kept as strings inside
//! the client and converted back to numbers when a request body is built.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Renders a JSON scalar as an id string.
///
/// Returns `None` for null, arrays and objects.
pub fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Converts an id back into the JSON shape the service expects:
/// integers go out as numbers, everything else as strings.
pub fn id_to_value(id: &str) -> Value {
    match id.parse::<i64>() {
        Ok(n) => Value::from(n),
        Err(_) => Value::String(id.to_string()),
    }
}

/// Serde helper accepting either a number or a string.
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_id(&value).ok_or_else(|| serde::de::Error::custom(format!("invalid id: {value}")))
}

/// Serde helper for optional ids; null becomes `None`.
pub fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_id))
}
