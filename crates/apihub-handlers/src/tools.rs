//! General-purpose tools: arithmetic and greetings.

use apihub_core::result::AppResult;
use apihub_plugin::{PluginHandler, PluginRequest, PluginResponse};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{HandlerError, HandlerResult};
use crate::params;

/// Arithmetic operations understood by [`CalculatorHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `a + b`
    Add,
    /// `a - b`
    Subtract,
    /// `a * b`
    Multiply,
    /// `a / b`, rejected when `b` is zero.
    Divide,
}

impl Operation {
    /// Parses an operation name, ignoring case.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "add" => Some(Self::Add),
            "subtract" => Some(Self::Subtract),
            "multiply" => Some(Self::Multiply),
            "divide" => Some(Self::Divide),
            _ => None,
        }
    }

    /// Applies the operation.
    pub fn apply(self, a: f64, b: f64) -> HandlerResult<f64> {
        match self {
            Self::Add => Ok(a + b),
            Self::Subtract => Ok(a - b),
            Self::Multiply => Ok(a * b),
            Self::Divide if b == 0.0 => Err(HandlerError::invalid("Division by zero is not allowed")),
            Self::Divide => Ok(a / b),
        }
    }
}

/// Basic four-function calculator.
#[derive(Debug, Clone, Default)]
pub struct CalculatorHandler;

impl CalculatorHandler {
    fn calculate(request: &PluginRequest) -> HandlerResult<Value> {
        let (Some(operation), Some(a), Some(b)) = (
            params::text(request, "operation"),
            request.param("a"),
            request.param("b"),
        ) else {
            return Err(HandlerError::MissingParameter("operation, a, b".to_string()));
        };

        let (Some(a), Some(b)) = (params::as_number(&a), params::as_number(&b)) else {
            return Err(HandlerError::invalid("Parameters a and b must be valid numbers"));
        };

        let op = Operation::parse(&operation)
            .ok_or_else(|| HandlerError::invalid("Invalid operation. Use: add, subtract, multiply, divide"))?;
        let result = op.apply(a, b)?;

        Ok(json!({
            "success": true,
            "operation": operation,
            "a": a,
            "b": b,
            "result": result,
            "timestamp": params::now_iso(),
        }))
    }
}

#[async_trait]
impl PluginHandler for CalculatorHandler {
    async fn handle(&self, request: PluginRequest) -> AppResult<PluginResponse> {
        Ok(PluginResponse::ok(Self::calculate(&request)?))
    }
}

/// Options accepted by [`HelloHandler`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HelloOptions {
    /// Word used before the name.
    pub greeting: String,
    /// Name used when the request carries none.
    pub default_name: String,
}

impl Default for HelloOptions {
    fn default() -> Self {
        Self {
            greeting: "Hello".to_string(),
            default_name: "World".to_string(),
        }
    }
}

/// Greets the caller by the optional `name` parameter.
#[derive(Debug, Clone, Default)]
pub struct HelloHandler {
    options: HelloOptions,
}

impl HelloHandler {
    /// Builds the handler from manifest options.
    pub fn from_options(options: &Value) -> HandlerResult<Self> {
        Ok(Self {
            options: params::options(options)?,
        })
    }
}

#[async_trait]
impl PluginHandler for HelloHandler {
    async fn handle(&self, request: PluginRequest) -> AppResult<PluginResponse> {
        let name = params::text(&request, "name").unwrap_or_else(|| self.options.default_name.clone());

        Ok(PluginResponse::ok(json!({
            "success": true,
            "message": format!("{}, {}!", self.options.greeting, name),
            "timestamp": params::now_iso(),
            "endpoint": "hello",
        })))
    }
}
