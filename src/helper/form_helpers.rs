use crate::models::{Choice, ValidationError};
use actix_web::web;
use serde_json::Value;

pub type JsonMap = serde_json::Map<String, Value>;

/// Parses a JSON object body from bytes, handling UTF-8 and shape errors gracefully.
pub fn parse_json_object(body: &web::Bytes) -> Result<JsonMap, ValidationError> {
    let text = std::str::from_utf8(body)
        .map_err(|_| ValidationError::new("Invalid UTF-8 in request body."))?;
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ValidationError::new("Request body must be a JSON object.")),
        Err(_) => Err(ValidationError::new("Request body is not valid JSON.")),
    }
}

fn present<'a>(body: &'a JsonMap, field: &str) -> Option<&'a Value> {
    body.get(field).filter(|v| !v.is_null())
}

/// A required, non-empty string field. Returned trimmed.
pub fn required_string(body: &JsonMap, field: &str) -> Result<String, ValidationError> {
    match present(body, field) {
        None => Err(ValidationError::new(format!("'{}' is required.", field))),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Err(ValidationError::new(format!("'{}' cannot be empty.", field)))
            } else {
                Ok(trimmed.to_string())
            }
        }
        Some(_) => Err(ValidationError::new(format!("'{}' must be a string.", field))),
    }
}

/// An optional string field. Blank strings count as absent.
pub fn optional_string(body: &JsonMap, field: &str) -> Result<Option<String>, ValidationError> {
    match present(body, field) {
        None => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(_) => Err(ValidationError::new(format!("'{}' must be a string.", field))),
    }
}

pub fn optional_bool(body: &JsonMap, field: &str) -> Result<Option<bool>, ValidationError> {
    match present(body, field) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(ValidationError::new(format!("'{}' must be a boolean.", field))),
    }
}

pub fn optional_i64(body: &JsonMap, field: &str) -> Result<Option<i64>, ValidationError> {
    match present(body, field) {
        None => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| ValidationError::new(format!("'{}' must be an integer.", field))),
    }
}

pub fn optional_u64(body: &JsonMap, field: &str) -> Result<Option<u64>, ValidationError> {
    match present(body, field) {
        None => Ok(None),
        Some(v) => v
            .as_u64()
            .map(Some)
            .ok_or_else(|| ValidationError::new(format!("'{}' must be a non-negative integer.", field))),
    }
}

pub fn optional_choice<T: Choice>(body: &JsonMap, field: &str) -> Result<Option<T>, ValidationError> {
    match optional_string(body, field)? {
        None => Ok(None),
        Some(raw) => T::parse_choice(&raw).map(Some).ok_or_else(|| {
            ValidationError::new(format!(
                "Invalid {} '{}'. Allowed values: {}.",
                field,
                raw,
                T::allowed()
            ))
        }),
    }
}

pub fn required_choice<T: Choice>(body: &JsonMap, field: &str) -> Result<T, ValidationError> {
    required_string(body, field)?;
    optional_choice(body, field)?.ok_or_else(|| ValidationError::new(format!("'{}' is required.", field)))
}
