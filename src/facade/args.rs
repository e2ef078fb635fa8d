//! Tool argument coercion
//!
//! Tool-call frameworks hand us loosely typed JSON. These helpers pull
//! typed values out of the argument object, raising `ValidationError`
//! with the argument name on any mismatch. Structured arguments accept
//! either an already-parsed value or a JSON-encoded string, because some
//! clients stringify complex arguments.

use serde_json::Value;

use crate::errors::XrayError;

/// Upstream JQL queries return at most this many results per page.
pub const MAX_RESULT_LIMIT: i64 = 100;

pub fn required_str<'a>(args: &'a Value, name: &str) -> Result<&'a str, XrayError> {
    match args.get(name) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s),
        Some(Value::String(_)) => Err(XrayError::Validation(format!(
            "Argument '{name}' must be a non-empty string"
        ))),
        Some(_) => Err(XrayError::Validation(format!(
            "Argument '{name}' must be a string"
        ))),
        None => Err(XrayError::Validation(format!(
            "Missing required argument '{name}'"
        ))),
    }
}

pub fn optional_str<'a>(args: &'a Value, name: &str) -> Result<Option<&'a str>, XrayError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(XrayError::Validation(format!(
            "Argument '{name}' must be a string"
        ))),
    }
}

pub fn optional_i64(args: &Value, name: &str) -> Result<Option<i64>, XrayError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| {
            XrayError::Validation(format!("Argument '{name}' must be an integer"))
        }).map(Some),
        Some(_) => Err(XrayError::Validation(format!(
            "Argument '{name}' must be an integer"
        ))),
    }
}

pub fn required_string_list(args: &Value, name: &str) -> Result<Vec<String>, XrayError> {
    match optional_string_list(args, name)? {
        Some(list) if !list.is_empty() => Ok(list),
        Some(_) => Err(XrayError::Validation(format!(
            "Argument '{name}' must not be empty"
        ))),
        None => Err(XrayError::Validation(format!(
            "Missing required argument '{name}'"
        ))),
    }
}

pub fn optional_string_list(args: &Value, name: &str) -> Result<Option<Vec<String>>, XrayError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => {
            let mut list = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => list.push(s.clone()),
                    _ => {
                        return Err(XrayError::Validation(format!(
                            "Argument '{name}' must be a list of strings"
                        )))
                    }
                }
            }
            Ok(Some(list))
        }
        Some(_) => Err(XrayError::Validation(format!(
            "Argument '{name}' must be a list of strings"
        ))),
    }
}

/// Accept a structured argument as a parsed JSON object or a JSON-encoded
/// string. Missing and null mean absent.
pub fn structured_object(args: &Value, name: &str) -> Result<Option<Value>, XrayError> {
    match structured_value(args, name)? {
        None => Ok(None),
        Some(value) if value.is_object() => Ok(Some(value)),
        Some(_) => Err(XrayError::Validation(format!(
            "Argument '{name}' must be a JSON object"
        ))),
    }
}

/// Same acceptance rules as `structured_object`, for array-shaped arguments.
pub fn structured_array(args: &Value, name: &str) -> Result<Option<Vec<Value>>, XrayError> {
    match structured_value(args, name)? {
        None => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(_) => Err(XrayError::Validation(format!(
            "Argument '{name}' must be a JSON array"
        ))),
    }
}

fn structured_value(args: &Value, name: &str) -> Result<Option<Value>, XrayError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) => serde_json::from_str(raw).map(Some).map_err(|e| {
            XrayError::Validation(format!("Argument '{name}' is not valid JSON: {e}"))
        }),
        Some(other) => Ok(Some(other.clone())),
    }
}

/// Read the `limit` argument, clamping it into [1, 100]. Absent means 100.
pub fn clamp_limit(args: &Value) -> Result<i64, XrayError> {
    let limit = optional_i64(args, "limit")?.unwrap_or(MAX_RESULT_LIMIT);
    Ok(limit.clamp(1, MAX_RESULT_LIMIT))
}
