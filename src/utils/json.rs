use serde_json::Value;

pub enum NullableValue {
    Omitted,
    Null,
    String(String),
}

pub fn classify_nullable(optional_value: Option<&Value>) -> Result<NullableValue, String> {
    match optional_value {
        None => Ok(NullableValue::Omitted),
        Some(Value::Null) => Ok(NullableValue::Null),
        Some(Value::String(s)) => Ok(NullableValue::String(s.to_owned())),
        Some(other) => Err(format!("expected string or null, got {other}")),
    }
}

/// Field that may be set but not cleared.
pub fn optional_string(body: &Value, field: &str) -> Result<Option<String>, String> {
    match classify_nullable(body.get(field))? {
        NullableValue::Omitted => Ok(None),
        NullableValue::Null => Err(format!("{field} cannot be null")),
        NullableValue::String(value) => Ok(Some(value.trim().to_string())),
    }
}

/// Field that may be cleared with `null` or an empty string.
pub fn nullable_string(body: &Value, field: &str) -> Result<Option<Option<String>>, String> {
    match classify_nullable(body.get(field))? {
        NullableValue::Omitted => Ok(None),
        NullableValue::Null => Ok(Some(None)),
        NullableValue::String(value) => {
            let trimmed = value.trim();
            Ok(Some((!trimmed.is_empty()).then(|| trimmed.to_string())))
        }
    }
}

pub fn optional_bool(body: &Value, field: &str) -> Result<Option<bool>, String> {
    match body.get(field) {
        None => Ok(None),
        Some(Value::Bool(value)) => Ok(Some(*value)),
        Some(other) => Err(format!("{field} must be a boolean, got {other}")),
    }
}
