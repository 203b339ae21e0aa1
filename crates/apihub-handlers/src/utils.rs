//! Utility handlers: UUID generation and timestamp conversion.

use apihub_core::result::AppResult;
use apihub_plugin::{PluginHandler, PluginRequest, PluginResponse};
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::error::{HandlerError, HandlerResult};
use crate::params;

/// Options accepted by [`UuidHandler`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UuidOptions {
    /// Largest `count` a request may ask for.
    pub max_count: i64,
}

impl Default for UuidOptions {
    fn default() -> Self {
        Self { max_count: 100 }
    }
}

/// Generates one or more random (v4) UUIDs.
#[derive(Debug, Clone, Default)]
pub struct UuidHandler {
    options: UuidOptions,
}

impl UuidHandler {
    /// Builds the handler from manifest options.
    pub fn from_options(options: &Value) -> HandlerResult<Self> {
        let options: UuidOptions = params::options(options)?;
        if options.max_count < 1 {
            return Err(HandlerError::InvalidOptions("max_count must be at least 1".to_string()));
        }
        Ok(Self { options })
    }

    fn generate(&self, request: &PluginRequest) -> HandlerResult<Value> {
        let max = self.options.max_count;
        let count = match request.param("count") {
            None => 1,
            Some(value) => params::as_integer(&value)
                .filter(|n| (1..=max).contains(n))
                .ok_or_else(|| HandlerError::invalid(format!("Count must be a number between 1 and {max}")))?,
        };

        let uuids: Vec<String> = (0..count).map(|_| Uuid::new_v4().to_string()).collect();
        let uuids = match uuids.as_slice() {
            [single] => Value::String(single.clone()),
            _ => json!(uuids),
        };

        Ok(json!({
            "success": true,
            "count": count,
            "uuids": uuids,
            "timestamp": params::now_iso(),
        }))
    }
}

#[async_trait]
impl PluginHandler for UuidHandler {
    async fn handle(&self, request: PluginRequest) -> AppResult<PluginResponse> {
        Ok(PluginResponse::ok(self.generate(&request)?))
    }
}

/// Converts between Unix timestamps and dates.
#[derive(Debug, Clone, Default)]
pub struct TimestampHandler;

impl TimestampHandler {
    fn convert(request: &PluginRequest) -> HandlerResult<Value> {
        let timestamp = params::text(request, "timestamp");
        let date = params::text(request, "date");

        if timestamp.is_none() && date.is_none() {
            return Ok(json!({
                "success": true,
                "current": describe(Utc::now()),
            }));
        }

        let mut result = Map::new();

        if let Some(raw) = timestamp {
            let seconds = params::as_integer(&Value::String(raw))
                .ok_or_else(|| HandlerError::invalid("Invalid timestamp format"))?;
            let moment = DateTime::from_timestamp(seconds, 0)
                .ok_or_else(|| HandlerError::invalid("Invalid timestamp format"))?;
            result.insert("fromTimestamp".to_string(), describe(moment));
        }

        if let Some(raw) = date {
            let moment = parse_date(&raw).ok_or_else(|| HandlerError::invalid("Invalid date format"))?;
            let mut described = describe(moment);
            if let Value::Object(fields) = &mut described {
                fields.insert("date".to_string(), Value::String(raw));
            }
            result.insert("fromDate".to_string(), described);
        }

        Ok(json!({
            "success": true,
            "result": result,
            "timestamp": params::now_iso(),
        }))
    }
}

#[async_trait]
impl PluginHandler for TimestampHandler {
    async fn handle(&self, request: PluginRequest) -> AppResult<PluginResponse> {
        Ok(PluginResponse::ok(Self::convert(&request)?))
    }
}

fn describe(moment: DateTime<Utc>) -> Value {
    json!({
        "timestamp": moment.timestamp(),
        "iso": moment.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        "local": moment.with_timezone(&Local).format("%-m/%-d/%Y, %-I:%M:%S %p").to_string(),
        "utc": moment.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
    })
}

/// Parses RFC 3339, RFC 2822, `YYYY-MM-DD HH:MM:SS`, or `YYYY-MM-DD` (UTC).
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|naive| naive.and_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
}
