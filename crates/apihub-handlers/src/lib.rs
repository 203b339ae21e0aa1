//! # apihub-handlers
//!
//! Built-in endpoint handlers for API Hub. Plugin manifests reference them
//! by name through the catalog returned by [`builtin_catalog`]:
//!
//! | Name | Handler |
//! |------|---------|
//! | `calculator` | [`tools::CalculatorHandler`] |
//! | `hello` | [`tools::HelloHandler`] |
//! | `uuid` | [`utils::UuidHandler`] |
//! | `timestamp` | [`utils::TimestampHandler`] |
//! | `text-generator` | [`text::TextGeneratorHandler`] |
//! | `url-info` | [`downloader::UrlInfoHandler`] |
//! | `ai-chat` | [`ai::ChatHandler`] |
//! | `ai-image` | [`ai::ImageHandler`] |

pub mod ai;
pub mod catalog;
pub mod downloader;
pub mod error;
pub mod params;
pub mod text;
pub mod tools;
pub mod utils;

pub use catalog::{BUILTIN_HANDLERS, builtin_catalog};
pub use error::{HandlerError, HandlerResult};
