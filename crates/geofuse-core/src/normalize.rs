use serde_json::Value;

use crate::models::Properties;

/// Lowercase-keyed copy of a feature's properties. `None` yields an empty map.
///
/// When two keys collide after folding, the one that sorts last wins.
pub fn normalize_properties(properties: Option<&Properties>) -> Properties {
    let mut out = Properties::new();
    if let Some(props) = properties {
        for (key, value) in props {
            out.insert(key.to_lowercase(), value.clone());
        }
    }
    out
}

/// String form of a property value, following JavaScript's `String(v)`.
///
/// Whole floats render without a fraction (`3.0` -> `"3"`).
pub fn js_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                n.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 => {
                        format!("{f:.0}")
                    }
                    Some(f) => f.to_string(),
                    None => n.to_string(),
                }
            }
        }
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => js_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// JavaScript truthiness of a property value.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Neither absent nor `null`.
pub fn is_present(value: Option<&Value>) -> bool {
    matches!(value, Some(v) if !v.is_null())
}

/// The value as a non-empty trimmed string, if it is a string at all.
pub fn trimmed_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
