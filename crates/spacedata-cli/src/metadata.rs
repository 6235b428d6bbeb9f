// Data-info parsing for `request-id --field`
//
// Builds the JSON object that is hashed into a request id. Dotted keys
// nest, so `area.name=Barcelona` becomes { "area": { "name": "Barcelona" } }.
// Values that parse as JSON scalars keep their type: `cloud=12.5` is a
// number, `ai=true` a bool, `note=null` a null. Anything else is a string.

use anyhow::{anyhow, Result};
use serde_json::{Map, Value};

/// Parses `key=value` arguments into a JSON object.
pub fn parse_fields(args: &[String]) -> Result<Value> {
    let mut root = Map::new();
    for arg in args {
        let (key, raw) = split_field(arg)?;
        insert_path(&mut root, key, coerce(raw))?;
    }
    Ok(Value::Object(root))
}

/// Reads a data-info object from a JSON file.
pub fn read_json_file(path: &std::path::Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("Failed to read '{}': {}", path.display(), e))?;
    let value: Value = serde_json::from_str(&content)
        .map_err(|e| anyhow!("Failed to parse '{}': {}", path.display(), e))?;
    if !value.is_object() {
        return Err(anyhow!("'{}' must contain a JSON object", path.display()));
    }
    Ok(value)
}

fn split_field(arg: &str) -> Result<(&str, &str)> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("Invalid field '{}'. Expected 'key=value'", arg))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(anyhow!("Empty key in field '{}'", arg));
    }
    Ok((key, value.trim()))
}

fn coerce(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Number(_) | Value::Bool(_) | Value::Null)) => value,
        _ => Value::String(raw.to_string()),
    }
}

fn insert_path(root: &mut Map<String, Value>, key: &str, value: Value) -> Result<()> {
    let segments: Vec<&str> = key.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(anyhow!("Invalid key '{}': empty segment", key));
    }
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| anyhow!("Empty key"))?;

    let mut current = root;
    for segment in parents {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match entry {
            Value::Object(map) => map,
            _ => {
                return Err(anyhow!(
                    "Cannot nest '{}': '{}' already holds a value",
                    key,
                    segment
                ))
            }
        };
    }

    if matches!(current.get(*last), Some(Value::Object(_))) {
        return Err(anyhow!("Cannot overwrite object '{}' with a value", key));
    }
    current.insert(last.to_string(), value);
    Ok(())
}
