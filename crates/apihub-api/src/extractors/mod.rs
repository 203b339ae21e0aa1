//! Custom Axum extractors.

pub mod body;
pub mod query;

pub use body::RequestBody;
pub use query::QueryMap;
