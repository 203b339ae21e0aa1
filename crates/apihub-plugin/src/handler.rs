//! Handler capability: what a plugin's route actually executes.
//!
//! Handlers are compiled into the server and exposed to manifests by name
//! through a [`HandlerCatalog`]. A manifest picks a handler with its
//! `handler` field and may pass an `options` object to the handler's
//! factory, so every (re)load builds a fresh handler instance from the
//! manifest's current content.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use apihub_core::result::AppResult;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

/// Framework-agnostic request handed to a plugin handler.
#[derive(Debug, Clone, Default)]
pub struct PluginRequest {
    /// Lower-case HTTP method.
    pub method: String,
    /// Request path (without query string).
    pub path: String,
    /// Decoded query-string parameters.
    pub query: HashMap<String, String>,
    /// JSON or form body, `Value::Null` when absent.
    pub body: Value,
    /// Request headers with lower-case names.
    pub headers: HashMap<String, String>,
}

impl PluginRequest {
    /// Returns a query-string parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Returns a top-level body field, treating JSON `null` as absent.
    pub fn body_field(&self, name: &str) -> Option<&Value> {
        self.body.get(name).filter(|v| !v.is_null())
    }

    /// Returns a parameter from the query string, falling back to the body.
    pub fn param(&self, name: &str) -> Option<Value> {
        self.query_param(name)
            .map(|s| Value::String(s.to_string()))
            .or_else(|| self.body_field(name).cloned())
    }
}

/// Response produced by a plugin handler.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginResponse {
    /// HTTP status code.
    pub status: u16,
    /// JSON response body.
    pub body: Value,
}

impl PluginResponse {
    /// Creates a `200 OK` response.
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    /// Creates a response with an explicit status code.
    pub fn with_status(status: u16, body: Value) -> Self {
        Self { status, body }
    }
}

/// The request/response capability every plugin route is bound to.
#[async_trait]
pub trait PluginHandler: Send + Sync + fmt::Debug {
    /// Handles one request. Validation failures are reported as
    /// `AppError::validation`, which the HTTP layer maps to 400.
    async fn handle(&self, request: PluginRequest) -> AppResult<PluginResponse>;
}

type BoxedHandlerFn =
    Arc<dyn Fn(PluginRequest) -> BoxFuture<'static, AppResult<PluginResponse>> + Send + Sync>;

/// A closure-based handler for quick handler creation.
#[derive(Clone)]
pub struct FnHandler {
    /// Handler name used in logs.
    name: String,
    /// Handler function.
    handler: BoxedHandlerFn,
}

impl fmt::Debug for FnHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler")
            .field("name", &self.name)
            .field("handler", &"<closure>")
            .finish()
    }
}

impl FnHandler {
    /// Creates a new closure-based handler.
    pub fn new<F, Fut>(name: &str, handler: F) -> Self
    where
        F: Fn(PluginRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<PluginResponse>> + Send + 'static,
    {
        Self {
            name: name.to_string(),
            handler: Arc::new(
                move |request: PluginRequest| -> BoxFuture<'static, AppResult<PluginResponse>> {
                    Box::pin(handler(request))
                },
            ),
        }
    }

    /// Returns the handler name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl PluginHandler for FnHandler {
    async fn handle(&self, request: PluginRequest) -> AppResult<PluginResponse> {
        (self.handler)(request).await
    }
}

/// Builds a handler from a manifest's `options` value.
pub type HandlerFactory = Arc<dyn Fn(&Value) -> AppResult<Arc<dyn PluginHandler>> + Send + Sync>;

/// Name → factory table consulted by the manifest loader.
#[derive(Clone, Default)]
pub struct HandlerCatalog {
    factories: HashMap<String, HandlerFactory>,
}

impl fmt::Debug for HandlerCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerCatalog")
            .field("handlers", &self.names())
            .finish()
    }
}

impl HandlerCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under `name`, replacing any previous entry.
    pub fn register_factory<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&Value) -> AppResult<Arc<dyn PluginHandler>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Arc::new(factory));
    }

    /// Registers a handler that ignores manifest options.
    pub fn register(&mut self, name: &str, handler: Arc<dyn PluginHandler>) {
        self.register_factory(name, move |_| Ok(Arc::clone(&handler)));
    }

    /// Builds the handler registered under `name`.
    ///
    /// Returns `None` when no such handler exists.
    pub fn build(&self, name: &str, options: &Value) -> Option<AppResult<Arc<dyn PluginHandler>>> {
        self.factories.get(name).map(|factory| factory(options))
    }

    /// Returns whether a handler is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Returns all registered handler names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of registered handlers.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apihub_core::error::AppError;
    use serde_json::json;

    fn echo() -> Arc<dyn PluginHandler> {
        Arc::new(FnHandler::new("echo", |req: PluginRequest| async move {
            Ok(PluginResponse::ok(json!({ "path": req.path })))
        }))
    }

    #[tokio::test]
    async fn test_fn_handler_invokes_closure() {
        let handler = echo();
        let response = handler
            .handle(PluginRequest {
                path: "/api/echo".to_string(),
                ..Default::default()
            })
            .await
            .expect("handled");
        assert_eq!(response.status, 200);
        assert_eq!(response.body["path"], "/api/echo");
    }

    #[test]
    fn test_catalog_build_unknown_returns_none() {
        let catalog = HandlerCatalog::new();
        assert!(catalog.build("missing", &Value::Null).is_none());
    }

    #[test]
    fn test_catalog_factory_receives_options() {
        let mut catalog = HandlerCatalog::new();
        catalog.register_factory("strict", |options| {
            if options.get("fail").and_then(Value::as_bool).unwrap_or(false) {
                return Err(AppError::validation("refused"));
            }
            Ok(echo())
        });

        assert!(matches!(catalog.build("strict", &json!({})), Some(Ok(_))));
        assert!(matches!(
            catalog.build("strict", &json!({ "fail": true })),
            Some(Err(_))
        ));
    }

    #[test]
    fn test_param_prefers_query_over_body() {
        let mut request = PluginRequest {
            body: json!({ "name": "body", "count": 3 }),
            ..Default::default()
        };
        request.query.insert("name".to_string(), "query".to_string());

        assert_eq!(request.param("name"), Some(json!("query")));
        assert_eq!(request.param("count"), Some(json!(3)));
        assert_eq!(request.param("missing"), None);
    }
}
