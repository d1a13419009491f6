//! Tool call arguments
//!
//! Wraps the caller's argument mapping with schema-driven defaults and typed
//! accessors. Every accessor failure is a `BangumiError::InvalidArgument`, so
//! a bad argument never reaches the API client.

use serde_json::{Map, Value};

use crate::error::{BangumiError, Result};

use super::definition::Tool;

/// Arguments of one tool invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Map<String, Value>,
}

impl Arguments {
    /// Accepts an object, or nothing at all
    pub fn from_value(value: Option<Value>) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::Object(values)) => Ok(Self { values }),
            Some(other) => Err(BangumiError::InvalidArgument(format!(
                "arguments must be an object, got {}",
                kind(&other)
            ))),
        }
    }

    /// Fill in schema defaults for absent or null parameters, recursing into
    /// object parameters that declare their own properties.
    pub fn with_defaults(mut self, tool: &Tool) -> Self {
        if let Some(props) = tool.properties() {
            apply_defaults(&mut self.values, props);
        }
        self
    }

    /// Fails with the first required parameter that is absent or blank
    pub fn check_required(&self, tool: &Tool) -> Result<()> {
        for name in tool.required() {
            if is_blank(self.values.get(name)) {
                return Err(BangumiError::missing(name));
            }
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    /// A positive identifier, given as a JSON integer or a decimal string
    pub fn id(&self, key: &str) -> Result<u64> {
        let value = self.present(key)?;
        parse_id(value).ok_or_else(|| positive_integer(key))
    }

    /// Optional integer parameter
    pub fn int(&self, key: &str) -> Result<Option<i64>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => parse_int(value)
                .map(Some)
                .ok_or_else(|| not_an_integer(key)),
        }
    }

    /// Required integer parameter (zero allowed)
    pub fn required_int(&self, key: &str) -> Result<i64> {
        self.int(key)?.ok_or_else(|| BangumiError::missing(key))
    }

    /// Required non-empty string
    pub fn string(&self, key: &str) -> Result<&str> {
        match self.present(key)? {
            Value::String(s) if !s.trim().is_empty() => Ok(s.as_str()),
            Value::String(_) => Err(BangumiError::missing(key)),
            other => Err(BangumiError::InvalidArgument(format!(
                "{} must be a string, got {}",
                key,
                kind(other)
            ))),
        }
    }

    /// Object parameter, `{}` when absent
    pub fn object(&self, key: &str) -> Result<Value> {
        match self.get(key) {
            None => Ok(Value::Object(Map::new())),
            Some(value @ Value::Object(_)) => Ok(value.clone()),
            Some(other) => Err(BangumiError::InvalidArgument(format!(
                "{} must be an object, got {}",
                key,
                kind(other)
            ))),
        }
    }

    /// Non-empty list of positive identifiers
    pub fn id_list(&self, key: &str) -> Result<Vec<u64>> {
        let items = match self.present(key)? {
            Value::Array(items) if !items.is_empty() => items,
            Value::Array(_) => return Err(BangumiError::missing(key)),
            other => {
                return Err(BangumiError::InvalidArgument(format!(
                    "{} must be an array of integers, got {}",
                    key,
                    kind(other)
                )));
            }
        };
        items
            .iter()
            .map(|item| {
                parse_id(item).ok_or_else(|| {
                    BangumiError::InvalidArgument(format!("{} must contain only positive integers", key))
                })
            })
            .collect()
    }

    /// Subset of the arguments, skipping absent keys
    pub fn pick(&self, keys: &[&str]) -> Value {
        let picked: Map<String, Value> = keys
            .iter()
            .filter_map(|&k| self.get(k).map(|v| (k.to_string(), v.clone())))
            .collect();
        Value::Object(picked)
    }

    /// Validate optional integer parameters and store them as JSON integers,
    /// so `"5"` goes out as `5`
    pub fn normalize_ints(&mut self, keys: &[&str]) -> Result<()> {
        normalize_map_ints(&mut self.values, keys)
    }

    fn present(&self, key: &str) -> Result<&Value> {
        let value = self.values.get(key);
        if is_blank(value) {
            return Err(BangumiError::missing(key));
        }
        value.ok_or_else(|| BangumiError::missing(key))
    }
}

/// `normalize_ints` for the fields of an object parameter
pub fn normalize_object_ints(object: &mut Value, keys: &[&str]) -> Result<()> {
    match object {
        Value::Object(map) => normalize_map_ints(map, keys),
        _ => Ok(()),
    }
}

fn normalize_map_ints(values: &mut Map<String, Value>, keys: &[&str]) -> Result<()> {
    for &key in keys {
        let Some(value) = values.get_mut(key).filter(|v| !v.is_null()) else {
            continue;
        };
        let n = parse_int(value).ok_or_else(|| not_an_integer(key))?;
        *value = Value::from(n);
    }
    Ok(())
}

fn apply_defaults(values: &mut Map<String, Value>, props: &Map<String, Value>) {
    for (name, schema) in props {
        let absent = values.get(name).is_none_or(Value::is_null);
        if absent {
            if let Some(default) = schema.get("default") {
                values.insert(name.clone(), default.clone());
            }
        }
        let nested = schema.get("properties").and_then(Value::as_object);
        if let (Some(Value::Object(inner)), Some(nested)) = (values.get_mut(name), nested) {
            apply_defaults(inner, nested);
        }
    }
}

/// Absent, null and blank strings count as "not given"
fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

fn parse_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_id(value: &Value) -> Option<u64> {
    parse_int(value).filter(|&n| n > 0).map(|n| n as u64)
}

fn not_an_integer(key: &str) -> BangumiError {
    BangumiError::InvalidArgument(format!("{} must be an integer", key))
}

fn positive_integer(key: &str) -> BangumiError {
    BangumiError::InvalidArgument(format!("{} must be a positive integer", key))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
