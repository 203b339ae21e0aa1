//! URL inspection.
//!
//! The page itself is not fetched; the response carries metadata derived
//! from the parsed URL.

use apihub_core::result::AppResult;
use apihub_plugin::{PluginHandler, PluginRequest, PluginResponse};
use async_trait::async_trait;
use serde_json::{Value, json};
use url::Url;

use crate::error::{HandlerError, HandlerResult};
use crate::params;

/// Parses a URL and reports its components.
#[derive(Debug, Clone, Default)]
pub struct UrlInfoHandler;

impl UrlInfoHandler {
    fn inspect(request: &PluginRequest) -> HandlerResult<Value> {
        let raw = params::required_text(request, "url")?;
        let url = Url::parse(&raw).map_err(|e| HandlerError::invalid(format!("Invalid URL format: {e}")))?;
        let domain = url.host_str().unwrap_or_default().to_string();

        Ok(json!({
            "success": true,
            "data": {
                "url": raw,
                "domain": domain,
                "protocol": format!("{}:", url.scheme()),
                "title": format!("Sample Title for {domain}"),
                "description": "This is a mock description of the webpage content.",
                "status": "accessible",
                "contentType": "text/html",
                "lastChecked": params::now_iso(),
            },
            "timestamp": params::now_iso(),
        }))
    }
}

#[async_trait]
impl PluginHandler for UrlInfoHandler {
    async fn handle(&self, request: PluginRequest) -> AppResult<PluginResponse> {
        Ok(PluginResponse::ok(Self::inspect(&request)?))
    }
}
