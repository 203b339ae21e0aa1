//! Body extractor accepting JSON or URL-encoded forms.

use apihub_core::error::AppError;
use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use bytes::Bytes;
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Request body decoded to JSON. An empty body is `Value::Null`.
///
/// `application/x-www-form-urlencoded` bodies become an object of string
/// fields. Any other content type is parsed as JSON when possible and
/// ignored otherwise; only a body declared as JSON must be valid JSON.
#[derive(Debug, Clone, Default)]
pub struct RequestBody(pub Value);

impl<S> FromRequest<S> for RequestBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;

        decode(&content_type, &bytes).map(Self).map_err(ApiError::from)
    }
}

/// Decodes a raw body according to its content type.
pub fn decode(content_type: &str, bytes: &[u8]) -> Result<Value, AppError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let fields: Map<String, Value> = url::form_urlencoded::parse(bytes)
            .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
            .collect();
        return Ok(Value::Object(fields));
    }

    match serde_json::from_slice(bytes) {
        Ok(value) => Ok(value),
        Err(e) if content_type.contains("json") => {
            Err(AppError::validation(format!("Malformed JSON body: {e}")))
        }
        Err(_) => Ok(Value::Null),
    }
}
