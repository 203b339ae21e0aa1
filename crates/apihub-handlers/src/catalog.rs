//! Registration of the built-in handlers under their manifest names.

use std::sync::Arc;

use apihub_core::config::AiConfig;
use apihub_plugin::{HandlerCatalog, PluginHandler};
use tracing::info;

use crate::ai::{AiClient, ChatHandler, ImageHandler};
use crate::downloader::UrlInfoHandler;
use crate::error::HandlerResult;
use crate::text::TextGeneratorHandler;
use crate::tools::{CalculatorHandler, HelloHandler};
use crate::utils::{TimestampHandler, UuidHandler};

/// Handler names accepted in a manifest's `handler` field.
pub const BUILTIN_HANDLERS: [&str; 8] = [
    "calculator",
    "hello",
    "uuid",
    "timestamp",
    "text-generator",
    "url-info",
    "ai-chat",
    "ai-image",
];

fn shared<H: PluginHandler + 'static>(handler: H) -> Arc<dyn PluginHandler> {
    Arc::new(handler)
}

/// Builds the catalog of every built-in handler.
pub fn builtin_catalog(ai: &AiConfig) -> HandlerResult<HandlerCatalog> {
    let client = AiClient::new(ai.clone())?;
    let mut catalog = HandlerCatalog::new();

    catalog.register("calculator", shared(CalculatorHandler));
    catalog.register("timestamp", shared(TimestampHandler));
    catalog.register("url-info", shared(UrlInfoHandler));

    catalog.register_factory("hello", |options| Ok(shared(HelloHandler::from_options(options)?)));
    catalog.register_factory("uuid", |options| Ok(shared(UuidHandler::from_options(options)?)));
    catalog.register_factory("text-generator", |options| {
        Ok(shared(TextGeneratorHandler::from_options(options)?))
    });

    let chat_client = client.clone();
    catalog.register_factory("ai-chat", move |options| {
        Ok(shared(ChatHandler::new(chat_client.clone(), options)?))
    });
    catalog.register_factory("ai-image", move |options| {
        Ok(shared(ImageHandler::new(client.clone(), options)?))
    });

    info!(handlers = catalog.len(), "Handler catalog ready");
    Ok(catalog)
}
