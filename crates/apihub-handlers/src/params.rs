//! Lenient parameter coercion shared by the handlers.
//!
//! Query strings and form bodies deliver every value as a string while JSON
//! bodies carry typed values, so numeric parameters accept both.

use apihub_plugin::PluginRequest;
use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{HandlerError, HandlerResult};

/// Returns a non-empty textual parameter.
pub fn text(request: &PluginRequest, name: &str) -> Option<String> {
    match request.param(name)? {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Returns a textual parameter or a missing-parameter error.
pub fn required_text(request: &PluginRequest, name: &str) -> HandlerResult<String> {
    text(request, name).ok_or_else(|| HandlerError::MissingParameter(name.to_string()))
}

/// Coerces a value to a finite number.
pub fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Coerces a value to an integer, truncating fractional numbers.
pub fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}

/// Deserializes manifest options, treating `null` as all defaults.
pub fn options<T: DeserializeOwned + Default>(options: &Value) -> HandlerResult<T> {
    if options.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(options.clone()).map_err(|e| HandlerError::InvalidOptions(e.to_string()))
}

/// Current time in the `2024-01-01T00:00:00.000Z` form.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_as_number_accepts_strings_and_numbers() {
        assert_eq!(as_number(&json!(2.5)), Some(2.5));
        assert_eq!(as_number(&json!(" 10 ")), Some(10.0));
        assert_eq!(as_number(&json!("ten")), None);
        assert_eq!(as_number(&json!(null)), None);
    }

    #[test]
    fn test_as_integer_truncates() {
        assert_eq!(as_integer(&json!("5")), Some(5));
        assert_eq!(as_integer(&json!(7.9)), Some(7));
        assert_eq!(as_integer(&json!("3.2")), Some(3));
        assert_eq!(as_integer(&json!("x")), None);
    }

    #[test]
    fn test_text_skips_empty_strings() {
        let request = PluginRequest {
            body: json!({ "name": "", "count": 3 }),
            ..Default::default()
        };
        assert_eq!(text(&request, "name"), None);
        assert_eq!(text(&request, "count"), Some("3".to_string()));
    }
}
